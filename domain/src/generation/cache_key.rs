//! Cache key normalization and fingerprinting.
//!
//! Keys are computed from a [`NormalizedRequest`]: a deep copy of the
//! request holding only the model id, sampling parameters and the message
//! sequence with non-deterministic metadata removed (timestamps, request ids,
//! backend-assigned call ids). The normalized form is serialized through
//! `serde_json::Value`, whose object maps are key-sorted, and hashed with
//! SHA-256.

use super::request::{GenerationRequest, SamplingParams};
use crate::session::entities::Role;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Fixed-width (64 hex chars) fingerprint of a pure-generation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key for `request`.
    ///
    /// Returns `None` for requests carrying a capability schema: replaying
    /// those from cache would silently skip the side effects they trigger.
    pub fn for_request(request: &GenerationRequest) -> Option<Self> {
        if request.carries_tool_schema() {
            return None;
        }
        Some(NormalizedRequest::from_request(request).fingerprint())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct NormalizedCall {
    name: String,
    arguments: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct NormalizedMessage {
    role: Role,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<NormalizedCall>,
}

/// Owned, metadata-free copy of the key-bearing parts of a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRequest {
    model: String,
    params: SamplingParams,
    messages: Vec<NormalizedMessage>,
}

impl NormalizedRequest {
    pub fn from_request(request: &GenerationRequest) -> Self {
        let messages = request
            .messages
            .iter()
            .map(|m| NormalizedMessage {
                role: m.role,
                content: m.content.clone(),
                tool_calls: m
                    .tool_calls
                    .iter()
                    .map(|c| NormalizedCall {
                        name: c.tool_name.clone(),
                        arguments: c.arguments.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            model: request.model.clone(),
            params: request.params.clone(),
            messages,
        }
    }

    /// Canonical JSON text: every object is emitted with sorted keys.
    pub fn canonical_json(&self) -> String {
        serde_json::to_value(self)
            .map(|value| value.to_string())
            .unwrap_or_default()
    }

    pub fn fingerprint(&self) -> CacheKey {
        let digest = Sha256::digest(self.canonical_json().as_bytes());
        CacheKey(hex::encode(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::entities::Message;
    use crate::tool::entities::{ToolCall, ToolDefinition};

    fn base_request() -> GenerationRequest {
        GenerationRequest::new("model-a")
            .with_message(Message::system("be brief"))
            .with_message(Message::user("summarize the plan"))
    }

    #[test]
    fn test_key_is_fixed_width_hex() {
        let key = CacheKey::for_request(&base_request()).unwrap();
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_metadata_excluded_from_key() {
        let plain = base_request();
        let stamped = GenerationRequest::new("model-a")
            .with_message(Message::system("be brief").stamped())
            .with_message(Message::user("summarize the plan").with_request_id("req-42"));

        assert_eq!(CacheKey::for_request(&plain), CacheKey::for_request(&stamped));
    }

    #[test]
    fn test_stream_flag_excluded_from_key() {
        let live = base_request().streaming(true);
        assert_eq!(CacheKey::for_request(&live), CacheKey::for_request(&base_request()));
    }

    #[test]
    fn test_call_ids_excluded_from_key() {
        let with_id = |id: &str| {
            base_request().with_message(
                Message::assistant("").with_tool_calls(vec![ToolCall::with_id(
                    id,
                    "read_file",
                    BTreeMap::new(),
                )]),
            )
        };
        assert_eq!(
            CacheKey::for_request(&with_id("toolu_1")),
            CacheKey::for_request(&with_id("toolu_2"))
        );
    }

    #[test]
    fn test_sampling_and_model_change_key() {
        let base = CacheKey::for_request(&base_request());
        let warmer = base_request().with_params(SamplingParams::default().with_temperature(0.7));
        let other_model = base_request();
        let other_model = GenerationRequest {
            model: "model-b".to_string(),
            ..other_model
        };

        assert_ne!(base, CacheKey::for_request(&warmer));
        assert_ne!(base, CacheKey::for_request(&other_model));
    }

    #[test]
    fn test_message_order_matters() {
        let swapped = GenerationRequest::new("model-a")
            .with_message(Message::user("summarize the plan"))
            .with_message(Message::system("be brief"));
        assert_ne!(CacheKey::for_request(&base_request()), CacheKey::for_request(&swapped));
    }

    #[test]
    fn test_tool_requests_have_no_key() {
        let req = base_request().with_tools(vec![ToolDefinition::new("terminate", "stop")]);
        assert!(CacheKey::for_request(&req).is_none());
    }

    #[test]
    fn test_mutating_caller_messages_never_changes_computed_key() {
        let mut messages = vec![Message::user("first")];
        let request = GenerationRequest::new("model-a").with_messages(messages.clone());
        let before = CacheKey::for_request(&request);

        messages[0].content.push_str(" (edited)");
        messages.push(Message::user("second"));

        assert_eq!(before, CacheKey::for_request(&request));
        let rebuilt = GenerationRequest::new("model-a").with_messages(messages);
        assert_ne!(before, CacheKey::for_request(&rebuilt));
    }
}
