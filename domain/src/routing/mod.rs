//! Task routing to specialized agent variants
//!
//! Routing is a pure function of a [`TaskDescriptor`] and a
//! [`RoutingTable`]: rules are evaluated in descending priority (ties keep
//! insertion order), the first match wins, and a miss falls back to the
//! table's default variant.

pub mod descriptor;
pub mod rule;
pub mod table;
pub mod variant;

pub use descriptor::TaskDescriptor;
pub use rule::MatchRule;
pub use table::{RouteDecision, RoutingRule, RoutingTable, TAG_RULE_PRIORITY};
pub use variant::{AgentVariant, standard_variants};
