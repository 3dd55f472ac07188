//! Decomposition parsing from model responses.
//!
//! Accepts a ` ```plan ` (or ` ```json `) fenced block, the whole response as
//! JSON, or the outermost `{...}` span. The expected schema:
//!
//! ```json
//! { "steps": [ { "description": "string", "executor": "string (optional)" } ] }
//! ```
//!
//! `tasks` is accepted for `steps`, and a step may be a bare string.

use serde_json::Value;

/// A step as proposed by the decomposition call, before ids are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDraft {
    pub description: String,
    pub executor_tag: Option<String>,
}

impl StepDraft {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            executor_tag: None,
        }
    }

    pub fn with_executor_tag(mut self, tag: impl Into<String>) -> Self {
        self.executor_tag = Some(tag.into());
        self
    }
}

/// Parse step drafts from a decomposition response.
///
/// Returns `None` when no candidate parses into a non-empty list of steps.
pub fn parse_decomposition(response: &str) -> Option<Vec<StepDraft>> {
    fenced_blocks(response)
        .into_iter()
        .chain(std::iter::once(response.trim().to_string()))
        .chain(outer_object(response))
        .filter_map(|candidate| serde_json::from_str::<Value>(&candidate).ok())
        .find_map(|json| drafts_from_json(&json))
}

fn fenced_blocks(response: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;

    for line in response.lines() {
        let trimmed = line.trim();
        if let Some(block) = current.as_mut() {
            if trimmed == "```" {
                blocks.extend(current.take());
            } else {
                block.push_str(line);
                block.push('\n');
            }
        } else if trimmed == "```plan" || trimmed == "```json" {
            current = Some(String::new());
        }
    }
    blocks
}

fn outer_object(response: &str) -> Option<String> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| response[start..=end].to_string())
}

fn drafts_from_json(json: &Value) -> Option<Vec<StepDraft>> {
    let items = json
        .get("steps")
        .or_else(|| json.get("tasks"))
        .and_then(|v| v.as_array())
        .or_else(|| json.as_array())?;

    let drafts: Vec<StepDraft> = items.iter().filter_map(draft_from_item).collect();
    (!drafts.is_empty()).then_some(drafts)
}

fn draft_from_item(item: &Value) -> Option<StepDraft> {
    if let Some(text) = item.as_str() {
        let text = text.trim();
        return (!text.is_empty()).then(|| StepDraft::new(text));
    }

    let description = item
        .get("description")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|d| !d.is_empty())?;

    let tag = ["executor", "executor_tag", "agent"]
        .iter()
        .find_map(|key| item.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|t| !t.is_empty() && *t != "null");

    let draft = StepDraft::new(description);
    Some(match tag {
        Some(tag) => draft.with_executor_tag(tag),
        None => draft,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_plan_block() {
        let response = r#"Here is the plan:
```plan
{"steps": [
  {"description": "Write a failing test", "executor": "test"},
  {"description": "Implement the fix"}
]}
```
Done."#;
        let drafts = parse_decomposition(response).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].executor_tag.as_deref(), Some("test"));
        assert_eq!(drafts[1].executor_tag, None);
    }

    #[test]
    fn test_parse_raw_json_with_tasks_alias() {
        let drafts =
            parse_decomposition(r#"{"tasks": ["one", "two", "  "]}"#).unwrap();
        assert_eq!(
            drafts,
            vec![StepDraft::new("one"), StepDraft::new("two")]
        );
    }

    #[test]
    fn test_parse_embedded_object() {
        let response = "Sure! {\"steps\": [{\"description\": \"a\", \"agent\": \"build\"}]} hope it helps";
        let drafts = parse_decomposition(response).unwrap();
        assert_eq!(drafts[0].executor_tag.as_deref(), Some("build"));
    }

    #[test]
    fn test_null_executor_ignored() {
        let drafts =
            parse_decomposition(r#"{"steps": [{"description": "a", "executor": "null"}]}"#).unwrap();
        assert_eq!(drafts[0].executor_tag, None);
    }

    #[test]
    fn test_parse_failures() {
        assert!(parse_decomposition("no plan here").is_none());
        assert!(parse_decomposition(r#"{"steps": []}"#).is_none());
        assert!(parse_decomposition(r#"{"steps": [{"title": "x"}]}"#).is_none());
    }
}
