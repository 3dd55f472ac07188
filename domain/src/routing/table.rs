//! Ordered routing table

use super::descriptor::TaskDescriptor;
use super::rule::MatchRule;
use serde::{Deserialize, Serialize};

/// One (match rule, variant, budget) entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Higher runs first.
    #[serde(default)]
    pub priority: i32,
    pub rule: MatchRule,
    pub variant: String,
    /// Overrides the variant's own step budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
}

impl RoutingRule {
    pub fn new(rule: MatchRule, variant: impl Into<String>) -> Self {
        Self {
            priority: 0,
            rule,
            variant: variant.into(),
            max_steps: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// Result of routing one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub variant: String,
    /// Index into [`RoutingTable::rules`]; `None` means the default was used.
    pub matched_rule: Option<usize>,
    pub max_steps: Option<usize>,
}

impl RouteDecision {
    /// No rule matched and the default variant was chosen.
    pub fn is_fallback(&self) -> bool {
        self.matched_rule.is_none()
    }
}

/// Priority of the executor tag rules in [`RoutingTable::standard`]. A tag
/// outranks the keywords of the description.
pub const TAG_RULE_PRIORITY: i32 = 10;

const STANDARD_VARIANTS: [&str; 3] = ["coding", "test", "build"];

/// Declarative, priority-ordered rule table with a default variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    rules: Vec<RoutingRule>,
    default_variant: String,
}

impl RoutingTable {
    pub fn new(default_variant: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default_variant: default_variant.into(),
        }
    }

    /// Add a rule, keeping rules ordered by descending priority.
    /// Rules of equal priority keep insertion order.
    pub fn with_rule(mut self, rule: RoutingRule) -> Self {
        self.rules.push(rule);
        self.rules.sort_by_key(|r| std::cmp::Reverse(r.priority));
        self
    }

    /// An executor tag naming a standard variant picks it. Otherwise `test`
    /// goes to the test variant, `build` to the build variant, the rest to
    /// coding.
    pub fn standard() -> Self {
        let keywords = Self::new("coding")
            .with_rule(RoutingRule::new(MatchRule::keyword("test"), "test"))
            .with_rule(RoutingRule::new(MatchRule::keyword("build"), "build"));
        STANDARD_VARIANTS.iter().fold(keywords, |table, name| {
            table.with_rule(
                RoutingRule::new(MatchRule::tag(*name), *name).with_priority(TAG_RULE_PRIORITY),
            )
        })
    }

    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    pub fn default_variant(&self) -> &str {
        &self.default_variant
    }

    /// Every variant name the table can produce.
    pub fn variant_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.iter().map(|r| r.variant.as_str()).collect();
        names.push(&self.default_variant);
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn route(&self, descriptor: &TaskDescriptor) -> RouteDecision {
        match self
            .rules
            .iter()
            .enumerate()
            .find(|(_, r)| r.rule.matches(descriptor))
        {
            Some((index, rule)) => RouteDecision {
                variant: rule.variant.clone(),
                matched_rule: Some(index),
                max_steps: rule.max_steps,
            },
            None => RouteDecision {
                variant: self.default_variant.clone(),
                matched_rule: None,
                max_steps: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_table() -> RoutingTable {
        RoutingTable::new("CodingAgent")
            .with_rule(RoutingRule::new(MatchRule::keyword("test"), "TestAgent"))
            .with_rule(RoutingRule::new(MatchRule::keyword("build"), "BuildAgent"))
    }

    #[test]
    fn test_routes_build_and_default() {
        let table = scenario_table();
        assert_eq!(table.route(&TaskDescriptor::new("run the build")).variant, "BuildAgent");

        let miss = table.route(&TaskDescriptor::new("refactor module"));
        assert_eq!(miss.variant, "CodingAgent");
        assert!(miss.is_fallback());
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let decision = scenario_table().route(&TaskDescriptor::new("build and test"));
        assert_eq!(decision.variant, "TestAgent");
        assert_eq!(decision.matched_rule, Some(0));
    }

    #[test]
    fn test_priority_reorders_rules() {
        let table = scenario_table().with_rule(
            RoutingRule::new(MatchRule::tag("docs"), "DocsAgent")
                .with_priority(10)
                .with_max_steps(4),
        );
        let decision =
            table.route(&TaskDescriptor::new("test the docs").with_executor_tag("docs"));
        assert_eq!(decision.variant, "DocsAgent");
        assert_eq!(decision.max_steps, Some(4));
        assert_eq!(table.rules()[0].variant, "DocsAgent");
    }

    #[test]
    fn test_routing_is_deterministic() {
        let table = scenario_table();
        let descriptor = TaskDescriptor::new("fix the failing test");
        let first = table.route(&descriptor);
        for _ in 0..10 {
            assert_eq!(table.route(&descriptor), first);
        }
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(
            scenario_table().variant_names(),
            vec!["BuildAgent", "CodingAgent", "TestAgent"]
        );
    }

    #[test]
    fn test_standard_table() {
        let table = RoutingTable::standard();
        assert_eq!(table.route(&TaskDescriptor::new("run the build")).variant, "build");
        assert_eq!(table.route(&TaskDescriptor::new("refactor module")).variant, "coding");
        assert_eq!(table.variant_names(), vec!["build", "coding", "test"]);
    }

    #[test]
    fn test_standard_tag_beats_description_keywords() {
        let table = RoutingTable::standard();

        let decision =
            table.route(&TaskDescriptor::new("document the API").with_executor_tag("build"));
        assert_eq!(decision.variant, "build");
        assert!(!decision.is_fallback());

        let decision =
            table.route(&TaskDescriptor::new("add a test for the parser").with_executor_tag("coding"));
        assert_eq!(decision.variant, "coding");
        assert_eq!(table.rules()[decision.matched_rule.unwrap()].rule, MatchRule::tag("coding"));

        let untagged = table.route(&TaskDescriptor::new("add a test for the parser"));
        assert_eq!(untagged.variant, "test");
    }

    #[test]
    fn test_unknown_tag_falls_through_to_keywords() {
        let decision = RoutingTable::standard()
            .route(&TaskDescriptor::new("run the build").with_executor_tag("deploy"));
        assert_eq!(decision.variant, "build");
    }
}
