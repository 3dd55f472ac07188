//! Replay backend for offline runs
//!
//! A script is a JSON array consumed front to back, one entry per backend
//! call:
//!
//! ```json
//! [
//!   "plain text answer",
//!   {"content": [{"type": "tool_use", "id": "c1", "name": "terminate", "input": {"summary": "done"}}]},
//!   {"error": "transient", "message": "503 from upstream"}
//! ]
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use stepwise_application::ports::llm_gateway::{GatewayError, GenerationBackend};
use stepwise_domain::{GenerationRequest, LlmResponse};
use thiserror::Error;
use tracing::debug;

/// Errors loading a backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to read script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid script: {0}")]
    InvalidScript(#[from] serde_json::Error),
}

/// Error kinds a script can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedFailure {
    Transient,
    Timeout,
    Malformed,
    Quota,
}

/// One scripted backend reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptEntry {
    Text(String),
    Failure {
        error: ScriptedFailure,
        #[serde(default)]
        message: String,
    },
    Response(LlmResponse),
}

impl ScriptEntry {
    fn into_result(self) -> Result<LlmResponse, GatewayError> {
        match self {
            ScriptEntry::Text(text) => Ok(LlmResponse::from_text(text)),
            ScriptEntry::Response(response) => Ok(response),
            ScriptEntry::Failure { error, message } => Err(match error {
                ScriptedFailure::Transient => GatewayError::Transient(message),
                ScriptedFailure::Timeout => {
                    GatewayError::Timeout(std::time::Duration::from_secs(0))
                }
                ScriptedFailure::Malformed => GatewayError::MalformedRequest(message),
                ScriptedFailure::Quota => GatewayError::QuotaExceeded(message),
            }),
        }
    }
}

/// [`GenerationBackend`] that replays a fixed script.
///
/// Once the script is used up every call fails as a malformed request, so a
/// run that needs more calls than scripted stops instead of looping.
#[derive(Debug)]
pub struct ScriptedBackend {
    entries: Mutex<VecDeque<ScriptEntry>>,
    served: Mutex<usize>,
}

impl ScriptedBackend {
    pub fn new(entries: Vec<ScriptEntry>) -> Self {
        Self {
            entries: Mutex::new(entries.into()),
            served: Mutex::new(0),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let entries: Vec<ScriptEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ProviderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn remaining(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn served(&self) -> usize {
        *self.served.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<LlmResponse, GatewayError> {
        let next = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(entry) = next else {
            return Err(GatewayError::MalformedRequest(
                "script exhausted: no response left for this request".to_string(),
            ));
        };
        let served = {
            let mut served = self.served.lock().unwrap_or_else(PoisonError::into_inner);
            *served += 1;
            *served
        };
        debug!(served, model = %request.model, "Serving scripted response");
        entry.into_result().map(|mut response| {
            response.model.get_or_insert_with(|| request.model.clone());
            response
        })
    }
}
