//! Feature ledger and progress log files shared with sub-agents
//!
//! Both files belong to one logical task. Writers inside a process are
//! serialized through a `tokio::sync::Mutex`; the ledger is replaced
//! atomically and the progress log is only ever appended to.

mod feature_file;
mod progress_log;

pub use feature_file::{FileFeatureLedger, LedgerFileError};
pub use progress_log::ProgressLog;
