//! Structured orchestration event logging.
//!
//! Provides [`JsonlConversationLogger`], an append-only JSONL writer that
//! implements the [`ConversationLogger`](stepwise_application::ConversationLogger) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlConversationLogger;
