//! LLM Gateway port
//!
//! Two layers: a [`GenerationBackend`] performs exactly one raw model call,
//! and an [`LlmGateway`] wraps a backend with caching, retry and timeouts.
//! Orchestrators only ever talk to an `LlmGateway`.

use async_trait::async_trait;
use std::time::Duration;
use stepwise_domain::{GenerationRequest, LlmResponse};
use thiserror::Error;

/// Errors that can occur during generation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The backend failed in a way that may succeed on retry.
    #[error("Transient backend error: {0}")]
    Transient(String),

    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),

    /// Retries were exhausted on transient failures.
    #[error("Backend unavailable after {attempts} attempt(s): {last}")]
    Unavailable { attempts: usize, last: String },

    #[error("Request malformed: {0}")]
    MalformedRequest(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Transient failures and timeouts are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transient(_) | GatewayError::Timeout(_))
    }

    /// Errors that abort the current step or iteration outright.
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Transient(_) => "transient",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Unavailable { .. } => "unavailable",
            GatewayError::MalformedRequest(_) => "malformed_request",
            GatewayError::QuotaExceeded(_) => "quota_exceeded",
            GatewayError::Cancelled => "cancelled",
        }
    }
}

/// One raw model call, no caching or retry.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend identifier for logs, e.g. `"scripted"`.
    fn name(&self) -> &str;

    async fn complete(&self, request: &GenerationRequest) -> Result<LlmResponse, GatewayError>;
}

/// Receives the response text of streaming requests.
///
/// Fired exactly once per `generate` call with `stream == true`, for live
/// calls and cache hits alike.
pub trait GenerationObserver: Send + Sync {
    fn on_text(&self, text: &str);
}

/// Observer that ignores everything.
pub struct NoObserver;

impl GenerationObserver for NoObserver {
    fn on_text(&self, _text: &str) {}
}

/// Gateway for LLM communication
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest,
        observer: &dyn GenerationObserver,
    ) -> Result<LlmResponse, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GatewayError::Transient("503".into()).is_retryable());
        assert!(GatewayError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(GatewayError::MalformedRequest("bad".into()).is_fatal());
        assert!(GatewayError::QuotaExceeded("limit".into()).is_fatal());
        assert!(
            GatewayError::Unavailable {
                attempts: 3,
                last: "503".into()
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_messages_distinguish_unavailable_from_malformed() {
        let unavailable = GatewayError::Unavailable {
            attempts: 3,
            last: "connection reset".into(),
        };
        let malformed = GatewayError::MalformedRequest("unknown field".into());
        assert!(unavailable.to_string().starts_with("Backend unavailable"));
        assert!(malformed.to_string().starts_with("Request malformed"));
        assert_eq!(unavailable.kind(), "unavailable");
    }
}
