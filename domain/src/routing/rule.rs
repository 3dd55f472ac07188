//! Match rules of the routing table

use super::descriptor::{TaskDescriptor, tokenize};
use serde::{Deserialize, Serialize};

/// A predicate over a task descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MatchRule {
    /// A word or phrase appearing on word boundaries, case-insensitive.
    Keyword(String),
    /// Any of several words or phrases.
    AnyKeyword(Vec<String>),
    /// The descriptor's executor tag equals this tag, case-insensitive.
    ExecutorTag(String),
}

impl MatchRule {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        MatchRule::Keyword(keyword.into())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        MatchRule::ExecutorTag(tag.into())
    }

    pub fn matches(&self, descriptor: &TaskDescriptor) -> bool {
        match self {
            MatchRule::Keyword(phrase) => contains_phrase(&descriptor.tokens(), phrase),
            MatchRule::AnyKeyword(phrases) => {
                let tokens = descriptor.tokens();
                phrases.iter().any(|p| contains_phrase(&tokens, p))
            }
            MatchRule::ExecutorTag(tag) => descriptor
                .executor_tag
                .as_deref()
                .is_some_and(|t| t.trim().eq_ignore_ascii_case(tag.trim())),
        }
    }
}

fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let needle = tokenize(phrase);
    if needle.is_empty() || needle.len() > tokens.len() {
        return false;
    }
    tokens.windows(needle.len()).any(|window| window == needle.as_slice())
}
