//! Built-in orchestration capabilities

use crate::ledger::{FileFeatureLedger, LedgerFileError, ProgressLog};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use stepwise_domain::tool::reserved::TERMINATE;
use stepwise_domain::{Capability, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult};
use tracing::info;

pub const UPDATE_FEATURE: &str = "update_feature";
pub const APPEND_PROGRESS: &str = "append_progress";

/// The reserved `terminate` capability.
///
/// The agent loop stops as soon as it sees the name; executing it only
/// echoes the optional summary back.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminateCapability;

#[async_trait]
impl Capability for TerminateCapability {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(TERMINATE, "Finish the task. Call this once the work is done.")
            .with_parameter(ToolParameter::new(
                "summary",
                "One-paragraph summary of what was accomplished",
                false,
            ))
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let summary = call.get_string("summary").unwrap_or_default();
        ToolResult::success(TERMINATE, &call.id, json!({ "terminated": true, "summary": summary }))
    }
}

/// Flips the `passes` flag of one feature ledger entry.
///
/// The entry is addressed by its exact description or by `index`. No other
/// field can be changed through this capability.
pub struct UpdateFeatureCapability {
    ledger: Arc<FileFeatureLedger>,
}

impl UpdateFeatureCapability {
    pub fn new(ledger: Arc<FileFeatureLedger>) -> Self {
        Self { ledger }
    }

    async fn update(&self, call: &ToolCall) -> Result<serde_json::Value, ToolError> {
        let passes = call
            .get_bool("passes")
            .ok_or_else(|| ToolError::invalid_argument("'passes' must be true or false"))?;

        let description = match (call.get_string("description"), call.get_u64("index")) {
            (Some(description), _) => description.to_string(),
            (None, Some(index)) => {
                let ledger = self.ledger.load().await.map_err(ledger_error)?;
                ledger
                    .entries()
                    .get(index as usize)
                    .map(|e| e.description.clone())
                    .ok_or_else(|| ToolError::not_found(format!("feature #{}", index)))?
            }
            (None, None) => {
                return Err(ToolError::invalid_argument(
                    "either 'description' or 'index' is required",
                ));
            }
        };

        let ledger = self
            .ledger
            .set_passes(&description, passes)
            .await
            .map_err(ledger_error)?;
        Ok(json!({
            "feature": description,
            "passes": passes,
            "passing": ledger.passing(),
            "total": ledger.len(),
        }))
    }
}

fn ledger_error(e: LedgerFileError) -> ToolError {
    match e {
        LedgerFileError::UnknownFeature(name) => ToolError::not_found(format!("feature '{}'", name)),
        other => ToolError::execution_failed(other.to_string()),
    }
}

#[async_trait]
impl Capability for UpdateFeatureCapability {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            UPDATE_FEATURE,
            "Mark a feature in the feature list as passing or failing. Only the pass flag can change.",
        )
        .with_parameter(ToolParameter::new(
            "description",
            "Exact description of the feature",
            false,
        ))
        .with_parameter(
            ToolParameter::new("index", "Zero-based position of the feature", false)
                .with_type("integer"),
        )
        .with_parameter(
            ToolParameter::new("passes", "Whether the feature now passes", true)
                .with_type("boolean"),
        )
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        match self.update(call).await {
            Ok(payload) => ToolResult::success(UPDATE_FEATURE, &call.id, payload),
            Err(e) => ToolResult::failure(UPDATE_FEATURE, &call.id, e),
        }
    }
}

/// Appends a note to the shared progress log.
pub struct AppendProgressCapability {
    log: Arc<ProgressLog>,
}

impl AppendProgressCapability {
    pub fn new(log: Arc<ProgressLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Capability for AppendProgressCapability {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            APPEND_PROGRESS,
            "Append a note to the progress log so later sessions know what happened.",
        )
        .with_parameter(ToolParameter::new("text", "The note to record", true))
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let text = match call.require_string("text") {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                return ToolResult::failure(
                    APPEND_PROGRESS,
                    &call.id,
                    ToolError::invalid_argument("'text' must not be empty"),
                );
            }
            Err(e) => {
                return ToolResult::failure(APPEND_PROGRESS, &call.id, ToolError::invalid_argument(e));
            }
        };

        match self.log.append(text).await {
            Ok(entry) => {
                info!(path = %self.log.path().display(), "Progress note appended");
                ToolResult::success(APPEND_PROGRESS, &call.id, json!({ "recorded": entry.to_line() }))
            }
            Err(e) => ToolResult::failure(
                APPEND_PROGRESS,
                &call.id,
                ToolError::execution_failed(format!("could not append progress: {}", e)),
            ),
        }
    }
}
