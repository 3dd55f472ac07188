//! Port for structured conversation logging.
//!
//! Separate from `tracing`: tracing carries human-readable diagnostics,
//! while this port records orchestration events (generations, capability
//! calls, step transitions, review cycles) in a machine-readable form.

use serde_json::Value;

/// One structured event.
///
/// The adapter adds the `type` and `timestamp` fields when writing.
#[derive(Debug, Clone)]
pub struct ConversationEvent {
    /// Event type, e.g. `"generation"`, `"capability_call"`, `"step_transition"`.
    pub event_type: &'static str,
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Sink for conversation events.
///
/// `log` is synchronous and infallible: a broken log must never interrupt a
/// plan or an agent run.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// Discards every event.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Keeps events in memory for assertions.
    #[derive(Default)]
    pub struct RecordingLogger {
        events: Mutex<Vec<ConversationEvent>>,
    }

    impl RecordingLogger {
        pub fn types(&self) -> Vec<&'static str> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.event_type)
                .collect()
        }

        pub fn of_type(&self, event_type: &str) -> Vec<Value> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.event_type == event_type)
                .map(|e| e.payload.clone())
                .collect()
        }
    }

    impl ConversationLogger for RecordingLogger {
        fn log(&self, event: ConversationEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
