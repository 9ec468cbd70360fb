use serde_json::{json, Value};

/// Message used when the server error body carries no usable message field
pub const FALLBACK_ERROR_MESSAGE: &str = "An error occurred";

/// Message used for failures where no HTTP response was obtained
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

/// Message prefix for calls rejected before anything was sent (bad header, mismatched body)
pub const INVALID_REQUEST_MESSAGE: &str = "Invalid request";

/// The single error shape surfaced by every API call.
///
/// `status` is the discriminant: `0` means no (usable) response was obtained, anything else is
/// the HTTP status code the backend answered with. `data` carries the server's error body, or a
/// `{"originalError": ...}` object describing the transport failure, or an `{"invalidRequest": ...}`
/// object when the caller's request could not be built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub message: String,
    pub status: u16,
    pub data: Value,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status: u16, data: Value) -> Self {
        ApiError {
            message: message.into(),
            status,
            data,
        }
    }

    /// Wraps a transport-level failure (connection refused, DNS, aborted body, etc)
    pub fn network(original: impl std::fmt::Display) -> Self {
        ApiError::new(
            NETWORK_ERROR_MESSAGE,
            0,
            json!({ "originalError": original.to_string() }),
        )
    }

    /// A request the caller got wrong and that was never sent
    pub fn invalid_request(reason: impl std::fmt::Display) -> Self {
        let reason = reason.to_string();
        ApiError::new(
            format!("{INVALID_REQUEST_MESSAGE}: {reason}"),
            0,
            json!({ "invalidRequest": reason }),
        )
    }

    /// Builds an error from a non-2xx response and its (possibly empty) JSON body.
    ///
    /// `detail` is preferred over `message`; non-string values are rendered as JSON.
    pub fn from_response(status: u16, body: Value) -> Self {
        let message = message_field(&body, "detail")
            .or_else(|| message_field(&body, "message"))
            .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());
        ApiError::new(message, status, body)
    }

    /// No response was obtained because the transport failed
    pub fn is_network(&self) -> bool {
        self.status == 0 && !self.is_invalid_request()
    }

    pub fn is_invalid_request(&self) -> bool {
        self.status == 0 && self.data.get("invalidRequest").is_some()
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

fn message_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_precedence() {
        let err = ApiError::from_response(401, json!({"detail": "invalid token", "message": "no"}));
        assert_eq!(err.message, "invalid token");
        assert_eq!(err.status, 401);
        assert!(err.is_unauthorized());

        let err = ApiError::from_response(422, json!({"message": "bad input"}));
        assert_eq!(err.message, "bad input");
        assert!(err.is_client_error());

        let err = ApiError::from_response(500, json!({}));
        assert_eq!(err.message, FALLBACK_ERROR_MESSAGE);
        assert!(err.is_server_error());

        // empty detail falls through, like a falsy value would
        let err = ApiError::from_response(400, json!({"detail": "", "message": "other"}));
        assert_eq!(err.message, "other");
    }

    #[test]
    fn test_structured_detail() {
        let body = json!({"detail": [{"loc": ["body", "mail"], "msg": "field required"}]});
        let err = ApiError::from_response(422, body.clone());
        assert!(err.message.contains("field required"));
        assert_eq!(err.data, body);
    }

    #[test]
    fn test_network() {
        let err = ApiError::network("connection refused");
        assert!(err.is_network());
        assert_eq!(err.message, NETWORK_ERROR_MESSAGE);
        assert_eq!(err.data["originalError"], "connection refused");
        assert_eq!(err.to_string(), "Network error (status 0)");
        assert!(!err.is_invalid_request());
    }

    #[test]
    fn test_invalid_request() {
        let err = ApiError::invalid_request("invalid header name \"bad header\"");
        assert_eq!(err.status, 0);
        assert!(err.is_invalid_request());
        assert!(!err.is_network());
        assert!(err.message.starts_with("Invalid request: "));
        assert_eq!(err.data["invalidRequest"], "invalid header name \"bad header\"");
        assert!(err.data.get("originalError").is_none());
    }
}
