//! Caching, retrying gateway over a raw generation backend

use super::cache::ResponseCache;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stepwise_application::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use stepwise_application::ports::llm_gateway::{
    GatewayError, GenerationBackend, GenerationObserver, LlmGateway,
};
use stepwise_application::retry::{Backoff, RetryError, RetryPolicy, retry_with};
use stepwise_domain::{CacheKey, GenerationRequest, LlmResponse};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Cache and retry behavior of a [`CachingGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySettings {
    pub cache_enabled: bool,
    pub cache_capacity: usize,
    /// Attempts per call, the first one included.
    pub retry: RetryPolicy,
    pub call_timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_capacity: 256,
            retry: RetryPolicy::new(
                3,
                Backoff::Exponential {
                    base: Duration::from_millis(500),
                    max: Duration::from_secs(8),
                },
            ),
            call_timeout: Duration::from_secs(120),
        }
    }
}

/// [`LlmGateway`] that consults a shared [`ResponseCache`] and retries
/// transient backend failures with backoff.
///
/// Requests carrying a capability schema are never cached. Retries that run
/// out surface as [`GatewayError::Unavailable`].
#[derive(Clone)]
pub struct CachingGateway {
    backend: Arc<dyn GenerationBackend>,
    cache: Arc<ResponseCache>,
    settings: GatewaySettings,
    logger: Arc<dyn ConversationLogger>,
    cancellation: Option<CancellationToken>,
}

impl CachingGateway {
    pub fn new(backend: Arc<dyn GenerationBackend>, settings: GatewaySettings) -> Self {
        let cache = Arc::new(ResponseCache::new(settings.cache_capacity));
        Self::with_cache(backend, cache, settings)
    }

    /// Share an existing cache, e.g. between gateways over different backends.
    pub fn with_cache(
        backend: Arc<dyn GenerationBackend>,
        cache: Arc<ResponseCache>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            backend,
            cache,
            settings,
            logger: Arc::new(NoConversationLogger),
            cancellation: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Abort in-flight calls and pending retries once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    fn cache_key(&self, request: &GenerationRequest) -> Option<CacheKey> {
        if !self.settings.cache_enabled {
            return None;
        }
        CacheKey::for_request(request)
    }

    async fn call_once(&self, request: &GenerationRequest) -> Result<LlmResponse, GatewayError> {
        let timeout = self.settings.call_timeout;
        let call = tokio::time::timeout(timeout, self.backend.complete(request));
        let result = match &self.cancellation {
            Some(token) => tokio::select! {
                _ = token.cancelled() => return Err(GatewayError::Cancelled),
                result = call => result,
            },
            None => call.await,
        };
        result.unwrap_or(Err(GatewayError::Timeout(timeout)))
    }

    async fn call_with_retry(
        &self,
        request: &GenerationRequest,
    ) -> Result<(LlmResponse, usize), GatewayError> {
        let result = retry_with(&self.settings.retry, GatewayError::is_retryable, |attempt| {
            async move {
                if let Some(previous) = &attempt.previous {
                    warn!(
                        backend = self.backend.name(),
                        attempt = attempt.number,
                        error = %previous,
                        "Retrying generation"
                    );
                }
                self.call_once(request).await
            }
        })
        .await;

        match result {
            Ok(retried) => Ok((retried.value, retried.attempts)),
            Err(RetryError {
                attempts,
                error,
                exhausted: true,
            }) => Err(GatewayError::Unavailable {
                attempts,
                last: error.to_string(),
            }),
            Err(RetryError { error, .. }) => Err(error),
        }
    }
}

#[async_trait]
impl LlmGateway for CachingGateway {
    async fn generate(
        &self,
        request: GenerationRequest,
        observer: &dyn GenerationObserver,
    ) -> Result<LlmResponse, GatewayError> {
        let key = self.cache_key(&request);

        if let Some(key) = &key
            && let Some(response) = self.cache.get(key)
        {
            debug!(key = %key.as_str(), "Generation served from cache");
            self.logger.log(ConversationEvent::new(
                "cache_hit",
                json!({ "model": request.model, "key": key.as_str() }),
            ));
            if request.stream {
                observer.on_text(&response.text_content());
            }
            return Ok(response);
        }

        let (response, attempts) = self.call_with_retry(&request).await?;
        if let Some(key) = &key {
            self.cache.insert(key.clone(), response.clone());
        }
        self.logger.log(ConversationEvent::new(
            "generation",
            json!({
                "backend": self.backend.name(),
                "model": request.model,
                "messages": request.messages.len(),
                "attempts": attempts,
                "cacheable": key.is_some(),
                "tool_calls": response.tool_calls().len(),
                "bytes": response.text_content().len(),
            }),
        ));
        if request.stream {
            observer.on_text(&response.text_content());
        }
        Ok(response)
    }
}
