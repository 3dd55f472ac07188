//! Routing configuration from TOML (`[routing]` section)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use stepwise_domain::routing::standard_variants;
use stepwise_domain::{
    AgentVariant, ConfigIssue, ConfigIssueCode, MatchRule, RoutingRule, RoutingTable,
};

/// Raw routing rule
///
/// Exactly one of `keyword`, `keywords` or `tag` selects the match rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoutingRule {
    pub keyword: Option<String>,
    pub keywords: Vec<String>,
    pub tag: Option<String>,
    pub variant: String,
    pub max_steps: Option<usize>,
    pub priority: i32,
}

impl FileRoutingRule {
    fn match_rule(&self) -> Option<MatchRule> {
        if let Some(tag) = self.tag.as_deref().filter(|t| !t.trim().is_empty()) {
            return Some(MatchRule::tag(tag));
        }
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            return Some(MatchRule::keyword(keyword));
        }
        let keywords: Vec<String> = self
            .keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .cloned()
            .collect();
        (!keywords.is_empty()).then_some(MatchRule::AnyKeyword(keywords))
    }
}

/// Raw agent variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileVariantConfig {
    pub name: String,
    pub system_prompt: String,
    pub max_steps: usize,
    /// Capability names the variant may use; omitted means all.
    pub capabilities: Option<Vec<String>>,
}

impl Default for FileVariantConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            system_prompt: String::new(),
            max_steps: 10,
            capabilities: None,
        }
    }
}

/// Raw routing configuration from TOML
///
/// Without any `[[routing.rules]]` the built-in table is used (`test`,
/// `build`, otherwise `coding`). Configured variants extend the built-in
/// `coding`/`test`/`build` variants, replacing any with the same name.
///
/// # Example
///
/// ```toml
/// [routing]
/// default_variant = "coding"
///
/// [[routing.rules]]
/// keywords = ["docs", "readme"]
/// variant = "writer"
/// priority = 10
///
/// [[routing.variants]]
/// name = "writer"
/// system_prompt = "You write documentation."
/// max_steps = 6
/// capabilities = ["append_progress"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoutingConfig {
    pub default_variant: String,
    pub rules: Vec<FileRoutingRule>,
    pub variants: Vec<FileVariantConfig>,
}

impl Default for FileRoutingConfig {
    fn default() -> Self {
        Self {
            default_variant: RoutingTable::standard().default_variant().to_string(),
            rules: Vec::new(),
            variants: Vec::new(),
        }
    }
}

impl FileRoutingConfig {
    /// Build the routing table. Rules without a match predicate are
    /// reported and skipped.
    pub fn to_table(&self) -> (RoutingTable, Vec<ConfigIssue>) {
        if self.rules.is_empty() {
            let table = RoutingTable::standard();
            if self.default_variant == table.default_variant() {
                return (table, vec![]);
            }
            let table = table.rules().iter().cloned().fold(
                RoutingTable::new(&self.default_variant),
                RoutingTable::with_rule,
            );
            return (table, vec![]);
        }

        let mut issues = Vec::new();
        let mut table = RoutingTable::new(&self.default_variant);
        for (index, raw) in self.rules.iter().enumerate() {
            let Some(rule) = raw.match_rule() else {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyRoutingRule { index },
                    format!(
                        "routing.rules[{}]: needs one of 'keyword', 'keywords' or 'tag', skipping",
                        index
                    ),
                ));
                continue;
            };
            let mut rule = RoutingRule::new(rule, &raw.variant).with_priority(raw.priority);
            if let Some(max) = raw.max_steps {
                rule = rule.with_max_steps(max);
            }
            table = table.with_rule(rule);
        }
        (table, issues)
    }

    /// Built-in variants overlaid with the configured ones.
    pub fn variants(&self) -> Vec<AgentVariant> {
        let mut variants = standard_variants();
        for raw in self.variants.iter().filter(|v| !v.name.trim().is_empty()) {
            let mut variant =
                AgentVariant::new(raw.name.trim(), &raw.system_prompt).with_max_steps(raw.max_steps);
            if let Some(names) = &raw.capabilities {
                variant = variant.with_capabilities(names.iter().cloned());
            }
            match variants.iter_mut().find(|v| v.name == variant.name) {
                Some(existing) => *existing = variant,
                None => variants.push(variant),
            }
        }
        variants
    }

    /// Table issues plus every variant the table names but nobody defines.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let (table, mut issues) = self.to_table();
        let known: HashSet<String> = self.variants().into_iter().map(|v| v.name).collect();
        for name in table.variant_names() {
            if !known.contains(name) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::UnknownVariant {
                        variant: name.to_string(),
                    },
                    format!("routing: variant '{}' is not defined", name),
                ));
            }
        }
        issues
    }
}
