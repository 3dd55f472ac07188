//! Generation gateway adapters
//!
//! ```text
//! LlmGateway::generate
//!     │
//!     ▼
//! CachingGateway ── cache hit ──▶ ResponseCache (process-wide LRU)
//!     │ miss
//!     ▼
//! retry_with(timeout(backend.complete))  ── Transient/Timeout ──▶ backoff, retry
//!     │
//!     ▼
//! GenerationBackend (ScriptedBackend, ...)
//! ```

mod cache;
mod caching;
mod scripted;

pub use cache::{CacheStats, ResponseCache};
pub use caching::{CachingGateway, GatewaySettings};
pub use scripted::{ProviderError, ScriptEntry, ScriptedBackend, ScriptedFailure};
