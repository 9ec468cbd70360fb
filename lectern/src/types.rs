/// Request and response bodies shared by the client, the CLI, and the tutor service (manually
/// entered; field names follow the backend's JSON)

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct Credentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub password: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    pub name: String,
    pub mail: String,
    pub password: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    System,
    User,
    Ai,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ChatMessage {
    pub fn new(kind: MessageKind, content: &str) -> Self {
        ChatMessage {
            id: None,
            kind,
            content: content.to_string(),
            timestamp: None,
        }
    }
}

/// Kinds of help a student can ask the tutor for; sent as `context.contextType`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextType {
    ExplainTopic,
    PracticeQuestions,
    CodeExamples,
    RealWorld,
    StudyGuide,
    QuizPrep,
}

impl ContextType {
    pub const ALL: [ContextType; 6] = [
        ContextType::ExplainTopic,
        ContextType::PracticeQuestions,
        ContextType::CodeExamples,
        ContextType::RealWorld,
        ContextType::StudyGuide,
        ContextType::QuizPrep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextType::ExplainTopic => "explain_topic",
            ContextType::PracticeQuestions => "practice_questions",
            ContextType::CodeExamples => "code_examples",
            ContextType::RealWorld => "real_world",
            ContextType::StudyGuide => "study_guide",
            ContextType::QuizPrep => "quiz_prep",
        }
    }
}

impl std::str::FromStr for ContextType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContextType::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown tutor context type: {}", s))
    }
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[allow(non_snake_case)]
#[derive(Debug, Default, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct ChatContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contextType: Option<String>,
}

impl ChatContext {
    /// The context type, if it is one the tutor knows
    pub fn known_type(&self) -> Option<ContextType> {
        self.contextType.as_deref()?.parse().ok()
    }
}

#[allow(non_snake_case)]
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct TutorChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ChatContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversationHistory: Option<Vec<ChatMessage>>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct TutorChatReply {
    pub message: String,
    pub timestamp: String,
}

#[allow(non_snake_case)]
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: u64,
    pub title: String,
    pub preview: String,
    /// Human-relative label, eg "2 hours ago"
    pub timestamp: String,
    pub messageCount: usize,
    pub lastUpdated: String,
}

#[allow(non_snake_case)]
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: u64,
    pub title: String,
    pub preview: String,
    pub timestamp: String,
    pub messageCount: usize,
    pub lastUpdated: String,
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id,
            title: self.title.clone(),
            preview: self.preview.clone(),
            timestamp: self.timestamp.clone(),
            messageCount: self.messageCount,
            lastUpdated: self.lastUpdated.clone(),
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct HistoryResponse {
    pub history: Vec<ConversationSummary>,
    pub total: usize,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct SaveConversationRequest {
    pub title: String,
    pub messages: Vec<ChatMessage>,
}

#[allow(non_snake_case)]
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct SaveConversationResponse {
    pub success: bool,
    pub conversationId: u64,
    pub message: String,
}

#[test]
fn test_chat_message_json() {
    use serde_json::json;
    let msg: ChatMessage = serde_json::from_value(json!({"type": "ai", "content": "hi"})).unwrap();
    assert_eq!(msg, ChatMessage::new(MessageKind::Ai, "hi"));
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        json!({"type": "ai", "content": "hi"})
    );

    let creds = Credentials {
        mail: Some("a@example.com".to_string()),
        name: None,
        password: "pw".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&creds).unwrap(),
        json!({"mail": "a@example.com", "password": "pw"})
    );
}

#[test]
fn test_context_type() {
    use std::str::FromStr;
    for c in ContextType::ALL {
        assert_eq!(ContextType::from_str(c.as_str()).unwrap(), c);
        assert_eq!(c.to_string(), c.as_str());
    }
    assert!(ContextType::from_str("homework").is_err());

    let ctx = ChatContext {
        contextType: Some("quiz_prep".to_string()),
    };
    assert_eq!(ctx.known_type(), Some(ContextType::QuizPrep));
    assert_eq!(ChatContext::default().known_type(), None);
}
