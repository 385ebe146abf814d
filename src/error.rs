use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

/// Errors surfaced to chat clients.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Missing Authorization header")]
    MissingAuthorization,
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Failed to start Gemini CLI: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Gemini CLI Process Failed")]
    ProcessFailed { code: Option<i32> },
    #[error("Gemini CLI tool execution failed: {0}")]
    ToolExecution(String),
}

impl BridgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            BridgeError::MissingAuthorization | BridgeError::InvalidApiKey => {
                StatusCode::UNAUTHORIZED
            }
            BridgeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BridgeError::Spawn(_) | BridgeError::ProcessFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            BridgeError::ToolExecution(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// OpenAI-style `{"error": {...}}` body. Also used for in-band SSE error frames.
    pub fn payload(&self) -> Value {
        let message = self.to_string();
        match self {
            BridgeError::MissingAuthorization
            | BridgeError::InvalidApiKey
            | BridgeError::InvalidRequest(_) => json!({
                "error": { "message": message, "type": "invalid_request_error" }
            }),
            BridgeError::ProcessFailed { code } => json!({
                "error": { "message": message, "code": code }
            }),
            BridgeError::Spawn(_) => json!({
                "error": { "message": message, "type": "server_error" }
            }),
            BridgeError::ToolExecution(_) => json!({
                "error": { "message": message, "type": "tool_execution_error" }
            }),
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.payload())).into_response()
    }
}
