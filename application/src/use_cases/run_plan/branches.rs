//! Parallel branches joined by a synthesis step
//!
//! Each branch gets its own agent, transcript and step budget. Branches
//! share a wall-clock budget; a branch that runs out of time finishes
//! truncated instead of failing. The synthesis step starts only after every
//! branch is terminal.

use super::PlanningOrchestrator;
use super::types::{Branch, BranchOutcome, BranchRunOutput, PlanRunError};
use crate::ports::conversation_logger::ConversationEvent;
use crate::use_cases::execute_agent::{AgentExecutor, AgentTask};
use crate::use_cases::sub_agents::{SubAgentRegistry, SubAgentReport};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use stepwise_domain::{AgentPromptTemplate, TaskDescriptor};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{info, warn};

const SYNTHESIS_PROMPT: &str = "You combine the results of independent work branches into one \
coherent answer. Note any branch that did not finish.";

/// Shown to the synthesis step in place of a failed branch's result.
const MISSING_RESULT: &str = "(no result: the branch did not finish)";

#[derive(Clone)]
enum BranchRunner {
    Routed(Arc<SubAgentRegistry>),
    Direct { executor: AgentExecutor, prompt: String },
}

impl BranchRunner {
    async fn run(self, branch: Branch, deadline: Instant) -> BranchOutcome {
        let report = match self {
            BranchRunner::Routed(registry) => {
                let mut descriptor = TaskDescriptor::new(&branch.description);
                if let Some(tag) = &branch.executor_tag {
                    descriptor = descriptor.with_executor_tag(tag);
                }
                registry
                    .spawn_until(&descriptor, branch.instructions, Some(deadline))
                    .await
            }
            BranchRunner::Direct { executor, prompt } => {
                let task = AgentTask::new(
                    &branch.name,
                    prompt,
                    branch.instructions,
                    executor.params().max_steps,
                )
                .with_deadline(deadline);
                executor.run(task).await.map(|output| SubAgentReport {
                    variant: branch.name.clone(),
                    matched_rule: None,
                    final_text: output.final_text,
                    summary: output.summary,
                })
            }
        };
        BranchOutcome {
            name: branch.name,
            report: report.map_err(|e| e.to_string()),
        }
    }
}

impl PlanningOrchestrator {
    /// Run `branches` concurrently, then synthesize one answer for `goal`.
    ///
    /// Outcomes are returned in submission order whatever order the
    /// branches finish in.
    pub async fn run_branches(
        &self,
        goal: &str,
        branches: Vec<Branch>,
    ) -> Result<BranchRunOutput, PlanRunError> {
        let services = self.executor.services();
        if services.is_cancelled() {
            return Err(PlanRunError::Cancelled);
        }

        let runner = match &self.sub_agents {
            Some(registry) => BranchRunner::Routed(Arc::clone(registry)),
            None => BranchRunner::Direct {
                executor: self.executor.clone(),
                prompt: self.step_prompt.clone(),
            },
        };
        let deadline = Instant::now() + self.params.branch_timeout;
        info!(
            branches = branches.len(),
            timeout_secs = self.params.branch_timeout.as_secs(),
            "Dispatching parallel branches"
        );

        let names: Vec<String> = branches.iter().map(|b| b.name.clone()).collect();
        let mut join_set = JoinSet::new();
        let mut positions = HashMap::new();
        for (index, branch) in branches.into_iter().enumerate() {
            let runner = runner.clone();
            let handle =
                join_set.spawn(async move { (index, runner.run(branch, deadline).await) });
            positions.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<BranchOutcome>> = vec![None; names.len()];
        while let Some(joined) = join_set.join_next().await {
            let (index, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    let Some(&index) = positions.get(&e.id()) else {
                        warn!(error = %e, "Branch task failed");
                        continue;
                    };
                    let outcome = BranchOutcome {
                        name: names[index].clone(),
                        report: Err(format!("branch task failed: {}", e)),
                    };
                    (index, outcome)
                }
            };
            services
                .progress
                .on_branch_finished(&outcome.name, outcome.succeeded());
            services.logger.log(ConversationEvent::new(
                "branch_finished",
                json!({
                    "branch": outcome.name,
                    "success": outcome.succeeded(),
                    "termination": outcome.report.as_ref().ok().and_then(|r| r.summary.termination),
                    "error": outcome.report.as_ref().err(),
                }),
            ));
            slots[index] = Some(outcome);
        }

        let outcomes: Vec<BranchOutcome> = slots
            .into_iter()
            .zip(names)
            .map(|(slot, name)| {
                slot.unwrap_or(BranchOutcome {
                    name,
                    report: Err("branch did not report".to_string()),
                })
            })
            .collect();

        if services.is_cancelled() {
            return Err(PlanRunError::Cancelled);
        }

        let results: Vec<(String, String)> = outcomes
            .iter()
            .map(|outcome| {
                let text = match &outcome.report {
                    Ok(report) if report.is_complete() => report.final_text.clone(),
                    Ok(report) if !report.final_text.trim().is_empty() => {
                        format!("(truncated) {}", report.final_text)
                    }
                    _ => MISSING_RESULT.to_string(),
                };
                (outcome.name.clone(), text)
            })
            .collect();

        let synthesis = AgentTask::new(
            "synthesis",
            SYNTHESIS_PROMPT,
            AgentPromptTemplate::synthesis(goal, &results),
            self.executor.params().max_steps,
        );
        let output = self.executor.run(synthesis).await?;

        Ok(BranchRunOutput {
            branches: outcomes,
            synthesis: output.final_text,
            synthesis_summary: output.summary,
        })
    }
}
