//! Infrastructure layer for stepwise
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the caching generation gateway, the capability
//! registry, file-backed stores, the JSONL conversation logger and
//! configuration file loading.

pub mod config;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod storage;
pub mod tools;

// Re-export commonly used types
pub use config::{ConfigLoader, FileConfig};
pub use gateway::{
    CacheStats, CachingGateway, GatewaySettings, ProviderError, ResponseCache, ScriptedBackend,
};
pub use ledger::{FileFeatureLedger, LedgerFileError, ProgressLog};
pub use logging::JsonlConversationLogger;
pub use storage::{CheckpointError, FileCheckpointStore, JsonFilePlanStore};
pub use tools::{
    AppendProgressCapability, CapabilityRegistry, TerminateCapability, UpdateFeatureCapability,
};
