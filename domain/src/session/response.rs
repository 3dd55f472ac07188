//! Structured responses returned by a generation backend.
//!
//! A response is an ordered list of content blocks mixing plain text and
//! capability-use requests. The executing agent treats a response without
//! any `ToolUse` block as a final answer.

use super::entities::Message;
use crate::tool::entities::ToolCall;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single block of content within a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text from the model.
    Text { text: String },

    /// A request to invoke a capability.
    ToolUse {
        /// Backend-assigned id used to correlate the result.
        id: String,
        name: String,
        #[serde(default)]
        input: BTreeMap<String, serde_json::Value>,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Other(String),
}

/// A structured model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl LlmResponse {
    /// Create a text-only response.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            stop_reason: Some(StopReason::EndTurn),
            model: None,
        }
    }

    /// Append a capability request, switching the stop reason to `ToolUse`.
    pub fn with_tool_use(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) -> Self {
        let input = match input {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        self.content.push(ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        });
        self.stop_reason = Some(StopReason::ToolUse);
        self
    }

    /// Concatenate all text blocks.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| b.as_text())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Extract every capability request as a [`ToolCall`].
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => {
                    Some(ToolCall::with_id(id.clone(), name.clone(), input.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    /// Convert into the assistant message appended to a transcript.
    pub fn to_message(&self) -> Message {
        Message::assistant(self.text_content()).with_tool_calls(self.tool_calls())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_text_creates_text_only_response() {
        let response = LlmResponse::from_text("Hello, world!");
        assert_eq!(response.text_content(), "Hello, world!");
        assert!(!response.has_tool_calls());
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
    }

    #[test]
    fn tool_use_blocks_become_tool_calls() {
        let response = LlmResponse::from_text("Reading...")
            .with_tool_use("call_1", "read_file", json!({"path": "/README.md"}));

        let calls = response.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].get_string("path"), Some("/README.md"));
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
    }

    #[test]
    fn to_message_keeps_text_and_calls() {
        let response =
            LlmResponse::from_text("working").with_tool_use("c1", "terminate", json!({}));
        let msg = response.to_message();
        assert!(msg.is_assistant());
        assert_eq!(msg.content, "working");
        assert_eq!(msg.tool_calls.len(), 1);
    }

    #[test]
    fn response_serde_shape() {
        let response = LlmResponse::from_text("hi");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "hi");

        let back: LlmResponse = serde_json::from_value(value).unwrap();
        assert_eq!(back, response);
    }
}
