//! Append-only JSONL writer for orchestration events.
//!
//! Each [`ConversationEvent`] becomes one JSON line carrying `type`, `seq`
//! and `timestamp` next to the event payload. Existing lines are never
//! rewritten; a new run appends after the previous one.

use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use stepwise_application::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use tracing::warn;

struct Sink {
    writer: BufWriter<File>,
    seq: u64,
}

/// JSONL logger that writes one event per line and flushes every line.
pub struct JsonlConversationLogger {
    sink: Mutex<Sink>,
    path: PathBuf,
}

impl JsonlConversationLogger {
    /// Open `path` for appending, creating it and its parent directories.
    ///
    /// Returns `None` if the file cannot be opened; callers fall back to
    /// running without an event log.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(dir = %parent.display(), error = %e, "Could not create event log directory");
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not open event log");
                return None;
            }
        };

        Some(Self {
            sink: Mutex::new(Sink {
                writer: BufWriter::new(file),
                seq: 0,
            }),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: ConversationEvent, seq: u64) -> Value {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let mut map = match event.payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        map.insert("type".to_string(), Value::from(event.event_type));
        map.insert("seq".to_string(), Value::from(seq));
        map.insert("timestamp".to_string(), Value::from(timestamp));
        Value::Object(map)
    }
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.seq += 1;
        let record = Self::record(event, sink.seq);
        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };
        if writeln!(sink.writer, "{}", line)
            .and_then(|_| sink.writer.flush())
            .is_err()
        {
            warn!(path = %self.path.display(), "Failed to write event log line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_events_become_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/run.jsonl");
        let logger = JsonlConversationLogger::open(&path).unwrap();

        logger.log(ConversationEvent::new(
            "step_transition",
            json!({"step_id": "step-1", "from": "pending", "to": "in_progress"}),
        ));
        logger.log(ConversationEvent::new("cache_hit", json!("abc123")));

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "step_transition");
        assert_eq!(lines[0]["to"], "in_progress");
        assert_eq!(lines[0]["seq"], 1);
        assert!(lines[0]["timestamp"].is_string());
        assert_eq!(lines[1]["data"], "abc123");
        assert_eq!(lines[1]["seq"], 2);
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");

        JsonlConversationLogger::open(&path)
            .unwrap()
            .log(ConversationEvent::new("plan_created", json!({"plan_id": "p1"})));
        JsonlConversationLogger::open(&path)
            .unwrap()
            .log(ConversationEvent::new("plan_created", json!({"plan_id": "p2"})));

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["plan_id"], "p1");
        assert_eq!(lines[1]["plan_id"], "p2");
    }

    #[test]
    fn test_unopenable_path_is_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file"), "x").unwrap();
        assert!(JsonlConversationLogger::open(dir.path().join("file/run.jsonl")).is_none());
    }
}
