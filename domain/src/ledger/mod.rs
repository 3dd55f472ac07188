//! Feature ledger and progress log shared with coding sub-agents
//!
//! The ledger is an ordered list of features whose only mutable field is
//! `passes`. The progress log is append-only.

pub mod feature;
pub mod progress;

pub use feature::{FeatureEntry, FeatureLedger, LedgerError};
pub use progress::ProgressEntry;
