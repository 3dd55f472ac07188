//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every field has a default, so partial files deserialize. Values that
//! cannot be used are reported as [`ConfigIssue`]s and replaced by a
//! fallback instead of failing the load.

mod agent;
mod gateway;
mod paths;
mod planning;
mod review;
mod routing;

pub use agent::FileAgentConfig;
pub use gateway::FileGatewayConfig;
pub use paths::FilePathsConfig;
pub use planning::FilePlanningConfig;
pub use review::FileReviewConfig;
pub use routing::{FileRoutingConfig, FileRoutingRule, FileVariantConfig};

use crate::gateway::GatewaySettings;
use serde::{Deserialize, Serialize};
use stepwise_application::OrchestrationParams;
use stepwise_domain::{AgentVariant, Checklist, ConfigIssue, RoutingTable};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Model, sampling, cache and retry settings
    pub gateway: FileGatewayConfig,
    /// Executing-agent loop settings
    pub agent: FileAgentConfig,
    /// Planning orchestrator settings
    pub planning: FilePlanningConfig,
    /// Review loop settings
    pub review: FileReviewConfig,
    /// Routing rules and agent variants
    pub routing: FileRoutingConfig,
    /// State, log and ledger locations
    pub paths: FilePathsConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.gateway.to_settings().1);
        issues.extend(self.agent.to_params().1);
        issues.extend(self.planning.to_params().1);
        issues.extend(self.review.to_params().1);
        issues.extend(self.routing.validate());
        issues
    }

    /// Loop-control parameters for every use case, with fallbacks applied.
    pub fn to_params(&self) -> OrchestrationParams {
        let (agent, _) = self.agent.to_params();
        let (planning, _) = self.planning.to_params();
        let (review, _) = self.review.to_params();
        OrchestrationParams::new(&self.gateway.model, planning.failure_policy)
            .with_sampling(self.gateway.sampling())
            .with_agent(agent)
            .with_planning(planning)
            .with_review(review)
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        self.gateway.to_settings().0
    }

    pub fn routing_table(&self) -> RoutingTable {
        self.routing.to_table().0
    }

    pub fn variants(&self) -> Vec<AgentVariant> {
        self.routing.variants()
    }

    pub fn checklist(&self) -> Checklist {
        self.review.checklist()
    }
}
