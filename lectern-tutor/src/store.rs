//! Saved tutor conversations.
//!
//! Only an in-memory store exists for now; everything is lost when the service restarts.

use anyhow::Result;
use lectern::format_timestamp;
use lectern::types::{ChatMessage, Conversation, ConversationSummary, MessageKind};
use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::{Duration, OffsetDateTime};

/// Number of characters of the first message used as a preview
const PREVIEW_CHARS: usize = 100;

pub trait ConversationStore: Send + Sync {
    /// Saves a new conversation, returning the assigned id
    fn put(&self, title: &str, messages: Vec<ChatMessage>) -> Result<u64>;

    fn get(&self, id: u64) -> Result<Option<Conversation>>;

    /// Every conversation without message bodies, most recently updated first
    fn summaries(&self) -> Result<Vec<ConversationSummary>>;
}

#[derive(Default)]
struct Inner {
    conversations: Vec<Conversation>,
    last_id: u64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Default::default()
    }

    /// A store pre-populated with two sample conversations
    pub fn with_demo_history() -> Self {
        let now = OffsetDateTime::now_utc();
        let ago = |millis: i64| format_timestamp(now - Duration::milliseconds(millis));
        let greeting = "Hello! I'm your AI tutor. How can I help you today?";
        let message = |id: u64, kind: MessageKind, content: &str, millis: i64| ChatMessage {
            id: Some(id),
            kind,
            content: content.to_string(),
            timestamp: Some(ago(millis)),
        };

        let ml_messages = vec![
            message(1, MessageKind::System, greeting, 7_200_000),
            message(2, MessageKind::User, "What is machine learning?", 7_000_000),
            message(
                3,
                MessageKind::Ai,
                "Machine learning is a subset of artificial intelligence that enables computers to learn and make decisions from data without being explicitly programmed for every task...",
                6_900_000,
            ),
        ];
        let python_messages = vec![message(1, MessageKind::System, greeting, 86_400_000)];

        let conversations = vec![
            Conversation {
                id: 1,
                title: "Machine Learning Basics".to_string(),
                preview: "What is the difference between supervised and unsupervised learning?"
                    .to_string(),
                timestamp: "2 hours ago".to_string(),
                messageCount: ml_messages.len(),
                lastUpdated: ago(7_200_000),
                messages: ml_messages,
            },
            Conversation {
                id: 2,
                title: "Python Data Structures".to_string(),
                preview: "Can you help me understand lists vs dictionaries?".to_string(),
                timestamp: "1 day ago".to_string(),
                messageCount: python_messages.len(),
                lastUpdated: ago(86_400_000),
                messages: python_messages,
            },
        ];
        MemoryStore {
            inner: Mutex::new(Inner {
                conversations,
                last_id: 2,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConversationStore for MemoryStore {
    fn put(&self, title: &str, messages: Vec<ChatMessage>) -> Result<u64> {
        let now = OffsetDateTime::now_utc();
        let mut inner = self.lock();
        // millisecond clock ids, bumped if two saves land in the same millisecond
        let id = std::cmp::max(unix_millis(now), inner.last_id + 1);
        inner.last_id = id;
        let messages = restamp(messages, now);
        let conversation = Conversation {
            id,
            title: title.to_string(),
            preview: preview(&messages),
            timestamp: "Just now".to_string(),
            messageCount: messages.len(),
            lastUpdated: format_timestamp(now),
            messages,
        };
        debug!(
            "saved conversation {} ({} messages)",
            id, conversation.messageCount
        );
        inner.conversations.push(conversation);
        Ok(id)
    }

    fn get(&self, id: u64) -> Result<Option<Conversation>> {
        Ok(self
            .lock()
            .conversations
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    fn summaries(&self) -> Result<Vec<ConversationSummary>> {
        let mut summaries: Vec<ConversationSummary> = self
            .lock()
            .conversations
            .iter()
            .map(Conversation::summary)
            .collect();
        // lastUpdated strings share one fixed-width format, so they sort chronologically
        summaries.sort_by(|a, b| b.lastUpdated.cmp(&a.lastUpdated));
        Ok(summaries)
    }
}

fn unix_millis(t: OffsetDateTime) -> u64 {
    (t.unix_timestamp_nanos() / 1_000_000) as u64
}

/// First message's leading characters, or a placeholder for an empty conversation
pub fn preview(messages: &[ChatMessage]) -> String {
    match messages.first() {
        Some(first) => format!(
            "{}...",
            first.content.chars().take(PREVIEW_CHARS).collect::<String>()
        ),
        None => "New conversation".to_string(),
    }
}

/// Numbers messages from 1 and spaces their timestamps one minute apart, the last one a minute
/// before `now`
fn restamp(messages: Vec<ChatMessage>, now: OffsetDateTime) -> Vec<ChatMessage> {
    let count = messages.len() as i64;
    messages
        .into_iter()
        .enumerate()
        .map(|(i, msg)| ChatMessage {
            id: Some(i as u64 + 1),
            timestamp: Some(format_timestamp(
                now - Duration::minutes(count - i as i64),
            )),
            ..msg
        })
        .collect()
}
