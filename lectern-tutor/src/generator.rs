//! Sources of tutor replies: hosted language models, with canned templates as the last resort.

use crate::templates;
use anyhow::{anyhow, Result};
use lectern::types::{ChatContext, ChatMessage, ContextType, MessageKind};
use log::{info, warn};
use serde_json::{json, Value};
use std::time::Duration;

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const HUGGINGFACE_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/microsoft/DialoGPT-medium";

/// Placeholder some deployments leave in their environment; treated as unset
const OPENAI_KEY_PLACEHOLDER: &str = "your-api-key-here";
/// Number of earlier user/ai messages passed upstream
const HISTORY_LIMIT: usize = 10;
const REQUEST_TIMEOUT_SECS: u64 = 60;

const BASE_SYSTEM_PROMPT: &str = "You are an AI tutor helping students learn. You are knowledgeable, patient, and encouraging. Always provide clear explanations and examples. Break down complex topics into understandable steps.";

/// Everything a generator may draw on for one reply
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub message: String,
    pub context: Option<ChatContext>,
    pub history: Vec<ChatMessage>,
}

impl Prompt {
    /// Base tutor instructions, extended for the requested kind of help
    pub fn system_prompt(&self) -> String {
        let extra = match self.context.as_ref().and_then(ChatContext::known_type) {
            None => return BASE_SYSTEM_PROMPT.to_string(),
            Some(ContextType::ExplainTopic) => {
                "Focus on providing a clear, detailed explanation of the topic."
            }
            Some(ContextType::PracticeQuestions) => {
                "Generate practice questions and exercises to test understanding."
            }
            Some(ContextType::CodeExamples) => {
                "Provide practical code examples and programming demonstrations."
            }
            Some(ContextType::RealWorld) => {
                "Show real-world applications and use cases of the concepts."
            }
            Some(ContextType::StudyGuide) => "Create an organized study guide or summary.",
            Some(ContextType::QuizPrep) => {
                "Help prepare for quizzes and exams with tips and strategies."
            }
        };
        format!("{} {}", BASE_SYSTEM_PROMPT, extra)
    }

    /// The most recent user and ai messages, as chat-completion roles
    pub fn upstream_history(&self) -> Vec<Value> {
        let relevant: Vec<&ChatMessage> = self
            .history
            .iter()
            .filter(|m| matches!(m.kind, MessageKind::User | MessageKind::Ai))
            .collect();
        relevant[relevant.len().saturating_sub(HISTORY_LIMIT)..]
            .iter()
            .map(|m| {
                let role = match m.kind {
                    MessageKind::User => "user",
                    _ => "assistant",
                };
                json!({"role": role, "content": m.content})
            })
            .collect()
    }
}

pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &Prompt) -> Result<String>;
}

/// Canned replies; never fails
pub struct TemplateGenerator;

impl TextGenerator for TemplateGenerator {
    fn generate(&self, prompt: &Prompt) -> Result<String> {
        let context = prompt.context.as_ref().and_then(ChatContext::known_type);
        Ok(templates::reply(&prompt.message, context))
    }
}

fn http_client() -> Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?)
}

fn post_json(
    http: &reqwest::blocking::Client,
    url: &str,
    api_key: &str,
    body: &Value,
) -> Result<Value> {
    let resp = http.post(url).bearer_auth(api_key).json(body).send()?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().unwrap_or_default();
        return Err(anyhow!("upstream returned {}: {}", status, text));
    }
    Ok(resp.json()?)
}

/// OpenAI chat completions
pub struct OpenAiGenerator {
    http: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        Ok(OpenAiGenerator {
            http: http_client()?,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl TextGenerator for OpenAiGenerator {
    fn generate(&self, prompt: &Prompt) -> Result<String> {
        let mut messages = vec![json!({"role": "system", "content": prompt.system_prompt()})];
        messages.extend(prompt.upstream_history());
        messages.push(json!({"role": "user", "content": prompt.message}));
        let body = json!({
            "model": OPENAI_MODEL,
            "messages": messages,
            "max_tokens": 500,
            "temperature": 0.7,
        });
        let url = format!("{}/chat/completions", self.base_url);
        let completion = post_json(&self.http, &url, &self.api_key, &body)?;
        Ok(completion["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("I'm sorry, I couldn't generate a response.")
            .to_string())
    }
}

/// Hugging Face hosted inference for a conversational model
pub struct HuggingFaceGenerator {
    http: reqwest::blocking::Client,
    api_key: String,
    model_url: String,
}

impl HuggingFaceGenerator {
    pub fn new(api_key: &str, model_url: &str) -> Result<Self> {
        Ok(HuggingFaceGenerator {
            http: http_client()?,
            api_key: api_key.to_string(),
            model_url: model_url.to_string(),
        })
    }
}

impl TextGenerator for HuggingFaceGenerator {
    fn generate(&self, prompt: &Prompt) -> Result<String> {
        let body = json!({
            "inputs": format!("{}\n\nStudent: {}\nTutor:", prompt.system_prompt(), prompt.message),
            "parameters": {
                "max_length": 200,
                "temperature": 0.7,
            },
        });
        let result = post_json(&self.http, &self.model_url, &self.api_key, &body)?;
        Ok(result[0]["generated_text"]
            .as_str()
            .unwrap_or("I'm here to help you learn! Could you please rephrase your question?")
            .to_string())
    }
}

/// Tries an upstream model first, answering from templates if there is none or it fails
pub struct TutorResponder {
    upstream: Option<Box<dyn TextGenerator>>,
}

impl TutorResponder {
    pub fn new(upstream: Option<Box<dyn TextGenerator>>) -> Self {
        TutorResponder { upstream }
    }

    /// Picks OpenAI if a real key is configured, then Hugging Face, else templates only
    pub fn from_keys(openai_key: Option<&str>, huggingface_key: Option<&str>) -> Result<Self> {
        let openai_key = openai_key.filter(|k| !k.is_empty() && *k != OPENAI_KEY_PLACEHOLDER);
        let huggingface_key = huggingface_key.filter(|k| !k.is_empty());
        let upstream: Option<Box<dyn TextGenerator>> = match (openai_key, huggingface_key) {
            (Some(key), _) => {
                info!("tutor replies from OpenAI ({})", OPENAI_MODEL);
                Some(Box::new(OpenAiGenerator::new(key, OPENAI_API_URL)?))
            }
            (None, Some(key)) => {
                info!("tutor replies from Hugging Face inference");
                Some(Box::new(HuggingFaceGenerator::new(
                    key,
                    HUGGINGFACE_MODEL_URL,
                )?))
            }
            (None, None) => {
                info!("no language model configured; tutor replies from templates");
                None
            }
        };
        Ok(TutorResponder::new(upstream))
    }

    pub fn has_upstream(&self) -> bool {
        self.upstream.is_some()
    }
}

impl TextGenerator for TutorResponder {
    fn generate(&self, prompt: &Prompt) -> Result<String> {
        if let Some(upstream) = &self.upstream {
            match upstream.generate(prompt) {
                Ok(reply) => return Ok(reply),
                Err(e) => warn!("language model call failed, using template reply: {:#}", e),
            }
        }
        TemplateGenerator.generate(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl TextGenerator for Failing {
        fn generate(&self, _prompt: &Prompt) -> Result<String> {
            Err(anyhow!("upstream down"))
        }
    }

    fn prompt(message: &str, context_type: Option<&str>) -> Prompt {
        Prompt {
            message: message.to_string(),
            context: context_type.map(|c| ChatContext {
                contextType: Some(c.to_string()),
            }),
            history: vec![],
        }
    }

    #[test]
    fn test_system_prompt() {
        assert_eq!(prompt("x", None).system_prompt(), BASE_SYSTEM_PROMPT);
        assert_eq!(
            prompt("x", Some("no_such_type")).system_prompt(),
            BASE_SYSTEM_PROMPT
        );
        assert!(prompt("x", Some("quiz_prep"))
            .system_prompt()
            .ends_with("Help prepare for quizzes and exams with tips and strategies."));
        assert!(prompt("x", Some("real_world"))
            .system_prompt()
            .ends_with("use cases of the concepts."));
    }

    #[test]
    fn test_upstream_history() {
        let mut p = prompt("next", None);
        p.history.push(ChatMessage::new(MessageKind::System, "welcome"));
        for i in 0..12 {
            let kind = if i % 2 == 0 {
                MessageKind::User
            } else {
                MessageKind::Ai
            };
            p.history.push(ChatMessage::new(kind, &format!("m{}", i)));
        }
        let history = p.upstream_history();
        assert_eq!(history.len(), 10);
        assert_eq!(history[0], json!({"role": "user", "content": "m2"}));
        assert_eq!(history[9], json!({"role": "assistant", "content": "m11"}));

        assert!(prompt("x", None).upstream_history().is_empty());
    }

    #[test]
    fn test_responder_fallback() {
        let p = prompt("hello", None);
        let responder = TutorResponder::new(Some(Box::new(Failing)));
        assert_eq!(
            responder.generate(&p).unwrap(),
            TemplateGenerator.generate(&p).unwrap()
        );
    }

    #[test]
    fn test_from_keys() {
        assert!(!TutorResponder::from_keys(None, None).unwrap().has_upstream());
        assert!(!TutorResponder::from_keys(Some(OPENAI_KEY_PLACEHOLDER), None)
            .unwrap()
            .has_upstream());
        assert!(TutorResponder::from_keys(Some(OPENAI_KEY_PLACEHOLDER), Some("hf"))
            .unwrap()
            .has_upstream());
        assert!(TutorResponder::from_keys(Some("sk-test"), None)
            .unwrap()
            .has_upstream());
    }
}
