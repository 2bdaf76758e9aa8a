use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

/// Local failures raised by the core before or after a round trip.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid call: {0}")]
    InvalidCall(String),
    #[error("Nothing queued to send")]
    EmptyBatch,
    #[error("Single-call mode needs exactly one queued call, found {queued}")]
    UnbatchedQueue { queued: usize },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("JSON error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl CoreError {
    pub fn invalid_call(message: impl Into<String>) -> Self {
        CoreError::InvalidCall(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        CoreError::MalformedResponse(message.into())
    }
}

/// The `error` member of one response, kept exactly as the server sent it.
///
/// Trac reports `{"name": ..., "message": ..., "code": ...}`; the accessors
/// read those members when present and fall back to the raw value otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteError(JsonValue);

impl RemoteError {
    pub fn new(raw: JsonValue) -> Self {
        RemoteError(raw)
    }

    pub fn raw(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_raw(self) -> JsonValue {
        self.0
    }

    pub fn code(&self) -> Option<i64> {
        self.0.get("code").and_then(JsonValue::as_i64)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(JsonValue::as_str)
    }

    pub fn message(&self) -> String {
        match self.0.get("message").and_then(JsonValue::as_str) {
            Some(message) => message.to_string(),
            None => match &self.0 {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name(), self.code()) {
            (Some(name), _) => write!(f, "{}: {}", name, self.message()),
            (None, Some(code)) => write!(f, "[{}] {}", code, self.message()),
            (None, None) => write!(f, "{}", self.message()),
        }
    }
}

impl std::error::Error for RemoteError {}
