//! Prompt templates for planning and executing agents

use crate::plan::policy::DecompositionBounds;
use crate::tool::entities::ToolDefinition;
use crate::tool::reserved::TERMINATE;

/// Templates for the planning orchestrator and executing agents
pub struct AgentPromptTemplate;

impl AgentPromptTemplate {
    /// System prompt of an executing agent: the variant's own prompt plus
    /// the capability list and termination rule.
    pub fn agent_system(base_prompt: &str, tools: &[ToolDefinition]) -> String {
        let tool_descriptions = tools
            .iter()
            .map(|t| {
                let params = t
                    .parameters
                    .iter()
                    .map(|p| {
                        let required = if p.required { " (required)" } else { "" };
                        format!("    - {} ({}): {}{}", p.name, p.param_type, p.description, required)
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                if params.is_empty() {
                    format!("- **{}**: {}", t.name, t.description)
                } else {
                    format!("- **{}**: {}\n{}", t.name, t.description, params)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"{base_prompt}

## Available Capabilities

{tool_descriptions}

## Rules

1. Work in small steps and check the result of every capability call.
2. A failed call is reported back to you; adjust and try again.
3. When the task is done, call `{terminate}` with a short summary, or reply
   with your final answer and no capability calls."#,
            terminate = TERMINATE,
        )
    }

    /// Ask for an ordered decomposition of `goal`.
    pub fn decomposition(
        goal: &str,
        bounds: DecompositionBounds,
        executor_tags: &[&str],
        feedback: Option<&str>,
    ) -> String {
        let tags = if executor_tags.is_empty() {
            String::new()
        } else {
            format!(
                "\nAn optional \"executor\" may name a specialist: {}.",
                executor_tags.join(", ")
            )
        };
        let retry = feedback
            .map(|f| format!("\n\nYour previous answer was rejected: {}", f))
            .unwrap_or_default();

        format!(
            r#"Break the following goal into between {min} and {max} ordered steps.
Each step must be small enough to verify on its own.{tags}

## Goal

{goal}

## Response Format

```plan
{{"steps": [{{"description": "...", "executor": "..."}}]}}
```{retry}"#,
            min = bounds.min(),
            max = bounds.max(),
        )
    }

    /// Task handed to the agent running one step.
    pub fn step_task(
        goal: &str,
        step_description: &str,
        completed: &[(String, String)],
        feedback: Option<&str>,
        attempt: usize,
    ) -> String {
        let mut prompt = format!(
            "## Overall Goal\n\n{}\n\n## Current Step\n\n{}\n",
            goal, step_description
        );

        if !completed.is_empty() {
            prompt.push_str("\n## Completed Steps\n\n");
            for (description, result) in completed {
                prompt.push_str(&format!("- {}: {}\n", description, result));
            }
        }

        if let Some(feedback) = feedback {
            prompt.push_str(&format!(
                "\n## Previous Attempt Rejected (attempt {} of this step)\n\n{}\n\nAddress this feedback before anything else.\n",
                attempt, feedback
            ));
        }
        prompt
    }

    /// Verification request for a step result.
    pub fn step_verification(step_description: &str, result: &str) -> String {
        format!(
            r#"You are verifying one step of a larger plan.

## Step

{step_description}

## Reported Result

{result}

Decide whether the result satisfies the step. Explain briefly, then end with
a JSON object on its own line: {{"grade": "PASS"}} or {{"grade": "FAIL"}}."#
        )
    }

    /// Join parallel branch results into one answer.
    pub fn synthesis(goal: &str, branches: &[(String, String)]) -> String {
        let body = branches
            .iter()
            .map(|(name, result)| format!("### {}\n\n{}", name, result))
            .collect::<Vec<_>>()
            .join("\n\n");
        format!(
            "Combine the results of the independent branches below into one answer for the goal.\n\n## Goal\n\n{}\n\n## Branch Results\n\n{}",
            goal, body
        )
    }
}
