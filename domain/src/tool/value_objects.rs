//! Capability result and error values
//!
//! A [`ToolResult`] is always serializable: successful payloads are arbitrary
//! JSON, failures carry a serialized [`ToolError`] and set `is_error`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error reported by a capability.
///
/// | Code | Meaning |
/// |------|---------|
/// | `NOT_FOUND` | Unknown capability or resource |
/// | `INVALID_ARGUMENT` | Arguments do not match the declared schema |
/// | `EXECUTION_FAILED` | The capability ran and failed |
/// | `TIMEOUT` | The capability did not finish in time |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", format!("Not found: {}", resource.into()))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new("TIMEOUT", format!("Timed out: {}", operation.into()))
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ToolError {}

/// Outcome of one capability invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub call_id: String,
    pub is_error: bool,
    pub payload: Value,
}

impl ToolResult {
    pub fn success(
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        payload: impl Into<Value>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            call_id: call_id.into(),
            is_error: false,
            payload: payload.into(),
        }
    }

    pub fn failure(
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        error: ToolError,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            call_id: call_id.into(),
            is_error: true,
            payload: serde_json::json!({ "error": error }),
        }
    }

    /// The error carried by a failed result, if it has the standard shape.
    pub fn error(&self) -> Option<ToolError> {
        if !self.is_error {
            return None;
        }
        self.payload
            .get("error")
            .and_then(|e| serde_json::from_value(e.clone()).ok())
    }

    /// Text fed back to the model as the tool message content.
    pub fn to_transcript_content(&self) -> String {
        let body = match &self.payload {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if self.is_error {
            format!("[error] {}", body)
        } else {
            body
        }
    }
}
