use anyhow::Result;
use lectern::types::{
    ChatContext, ChatMessage, HistoryResponse, SaveConversationResponse, TutorChatReply,
};
use log::{error, info, warn};
use rouille::{router, Request, Response};
use serde_json::{json, Value};

pub mod generator;
pub mod store;
mod templates;

pub use generator::{Prompt, TextGenerator, TutorResponder};
pub use store::{ConversationStore, MemoryStore};

/// Collaborators shared by every request handler
pub struct TutorState {
    pub store: Box<dyn ConversationStore>,
    pub generator: Box<dyn TextGenerator>,
}

pub fn run_server(port: u16, state: TutorState) -> Result<()> {
    let log_ok = |req: &Request, resp: &Response, elap: std::time::Duration| {
        info!(
            "{} {} {} ({:?})",
            req.method(),
            req.raw_url(),
            resp.status_code,
            elap
        );
    };
    let log_err = |req: &Request, elap: std::time::Duration| {
        error!(
            "HTTP handler panicked: {} {} ({:?})",
            req.method(),
            req.raw_url(),
            elap
        );
    };
    info!("tutor service listening on port {}", port);
    rouille::start_server(format!("localhost:{}", port), move |request| {
        rouille::log_custom(request, log_ok, log_err, || handle(request, &state))
    });
}

/// Error body carrying both `error` and `detail`; clients prefer `detail`
fn error_response(status: u16, msg: &str) -> Response {
    Response::json(&json!({ "error": msg, "detail": msg })).with_status_code(status)
}

/// Routes one request. Exposed separately from [`run_server`] so it can be driven directly.
pub fn handle(request: &Request, state: &TutorState) -> Response {
    router!(request,
        (GET) ["/"] => {
            Response::text("lectern tutor service")
        },
        (POST) ["/api/ai/chat"] => {
            chat(request, state)
        },
        (GET) ["/api/ai/history"] => {
            history(state)
        },
        (POST) ["/api/ai/save"] => {
            save(request, state)
        },
        (POST) ["/api/ai/conversation"] => {
            save(request, state)
        },
        (GET) ["/api/ai/conversation/{id}", id: u64] => {
            load(id, state)
        },
        _ => error_response(404, "Not found")
    )
}

fn json_body(request: &Request) -> Option<Value> {
    match rouille::input::json_input::<Value>(request) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("rejecting unparsable body: {}", e);
            None
        }
    }
}

fn chat(request: &Request, state: &TutorState) -> Response {
    let body = match json_body(request) {
        Some(v) => v,
        None => return error_response(400, "Invalid JSON body"),
    };
    let message = match body["message"].as_str().filter(|m| !m.is_empty()) {
        Some(m) => m.to_string(),
        None => return error_response(400, "Message is required"),
    };
    // malformed context or history is ignored rather than rejected
    let prompt = Prompt {
        message,
        context: serde_json::from_value::<ChatContext>(body["context"].clone()).ok(),
        history: serde_json::from_value::<Vec<ChatMessage>>(body["conversationHistory"].clone())
            .unwrap_or_default(),
    };
    match state.generator.generate(&prompt) {
        Ok(message) => Response::json(&TutorChatReply {
            message,
            timestamp: lectern::timestamp_now(),
        }),
        Err(e) => {
            error!("tutor reply failed: {:#}", e);
            error_response(500, "Failed to process your message. Please try again.")
        }
    }
}

fn history(state: &TutorState) -> Response {
    match state.store.summaries() {
        Ok(history) => Response::json(&HistoryResponse {
            total: history.len(),
            history,
        }),
        Err(e) => {
            error!("listing conversations: {:#}", e);
            error_response(500, "Failed to fetch conversation history")
        }
    }
}

fn save(request: &Request, state: &TutorState) -> Response {
    let body = match json_body(request) {
        Some(v) => v,
        None => return error_response(400, "Invalid JSON body"),
    };
    let title = body["title"].as_str().filter(|t| !t.is_empty());
    let (title, messages) = match (title, body["messages"].is_array()) {
        (Some(title), true) => (title, body["messages"].clone()),
        _ => return error_response(400, "Title and messages are required"),
    };
    let messages: Vec<ChatMessage> = match serde_json::from_value(messages) {
        Ok(m) => m,
        Err(e) => {
            warn!("rejecting malformed messages: {}", e);
            return error_response(400, "Messages must each have a type and content");
        }
    };
    match state.store.put(title, messages) {
        Ok(id) => Response::json(&SaveConversationResponse {
            success: true,
            conversationId: id,
            message: "Conversation saved successfully".to_string(),
        }),
        Err(e) => {
            error!("saving conversation: {:#}", e);
            error_response(500, "Failed to save conversation")
        }
    }
}

fn load(id: u64, state: &TutorState) -> Response {
    match state.store.get(id) {
        Ok(Some(conversation)) => Response::json(&conversation),
        Ok(None) => error_response(404, "Conversation not found"),
        Err(e) => {
            error!("loading conversation {}: {:#}", id, e);
            error_response(500, "Failed to load conversation")
        }
    }
}
