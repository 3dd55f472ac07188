//! Prompt templates for the Doer-Critic loop

use crate::review::checklist::Checklist;

/// Templates for the producer and reviewer agents
pub struct ReviewPromptTemplate;

impl ReviewPromptTemplate {
    pub fn reviewer_system(checklist: &Checklist) -> String {
        format!(
            r#"You are a senior reviewer. Evaluate the artifact against every criterion below.

## Criteria

{criteria}

## Response Format

Comment on each criterion, list concrete issues and suggestions, then end
with a JSON object on its own line: {{"grade": "PASS"}} or {{"grade": "FAIL"}}.
Grade PASS only if every criterion is satisfied."#,
            criteria = checklist.render()
        )
    }

    pub fn review_request(task: &str, artifact: &str) -> String {
        format!("## Task\n\n{}\n\n## Artifact\n\n{}", task, artifact)
    }

    /// Producer prompt; the first iteration has no artifact and no feedback.
    pub fn producer(task: &str, previous: Option<&str>, feedback: Option<&str>) -> String {
        match (previous, feedback) {
            (Some(artifact), Some(feedback)) => format!(
                "## Task\n\n{}\n\n## Your Previous Version\n\n{}\n\n## Reviewer Feedback\n\n{}\n\nRevise the artifact to address every point. Reply with the full revised artifact.",
                task, artifact, feedback
            ),
            _ => format!("## Task\n\n{}\n\nReply with the complete artifact.", task),
        }
    }
}
