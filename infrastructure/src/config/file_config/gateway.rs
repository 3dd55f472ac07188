//! Gateway configuration from TOML (`[gateway]` section)

use crate::gateway::GatewaySettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stepwise_application::{Backoff, RetryPolicy};
use stepwise_domain::{ConfigIssue, ConfigIssueCode, SamplingParams};

/// Raw gateway configuration from TOML
///
/// # Example
///
/// ```toml
/// [gateway]
/// model = "claude-sonnet-4.5"
/// temperature = 0.2
/// cache_enabled = true
/// cache_capacity = 256
/// max_retries = 2          # retries after the first attempt
/// backoff_base_ms = 500
/// backoff_max_ms = 8000
/// call_timeout_secs = 120
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGatewayConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub cache_enabled: bool,
    pub cache_capacity: usize,
    pub max_retries: usize,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub call_timeout_secs: u64,
}

impl Default for FileGatewayConfig {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            temperature: 0.0,
            max_tokens: None,
            cache_enabled: true,
            cache_capacity: 256,
            max_retries: 2,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
            call_timeout_secs: 120,
        }
    }
}

impl FileGatewayConfig {
    pub fn sampling(&self) -> SamplingParams {
        let sampling = SamplingParams::default().with_temperature(self.temperature);
        match self.max_tokens {
            Some(max) => sampling.with_max_tokens(max),
            None => sampling,
        }
    }

    /// Convert to [`GatewaySettings`], falling back on unusable values.
    pub fn to_settings(&self) -> (GatewaySettings, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let defaults = Self::default();

        let cache_capacity = if self.cache_capacity == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroBudget {
                    field: "gateway.cache_capacity".to_string(),
                },
                "gateway.cache_capacity: 0 is not allowed, using 1",
            ));
            1
        } else {
            self.cache_capacity
        };

        let (base, max) = if self.backoff_base_ms > self.backoff_max_ms {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidBounds {
                    field: "gateway.backoff_base_ms..backoff_max_ms".to_string(),
                    min: self.backoff_base_ms as usize,
                    max: self.backoff_max_ms as usize,
                },
                format!(
                    "gateway: backoff_base_ms ({}) exceeds backoff_max_ms ({}), using defaults",
                    self.backoff_base_ms, self.backoff_max_ms
                ),
            ));
            (defaults.backoff_base_ms, defaults.backoff_max_ms)
        } else {
            (self.backoff_base_ms, self.backoff_max_ms)
        };

        let call_timeout_secs = if self.call_timeout_secs == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroBudget {
                    field: "gateway.call_timeout_secs".to_string(),
                },
                format!(
                    "gateway.call_timeout_secs: 0 is not allowed, using {}",
                    defaults.call_timeout_secs
                ),
            ));
            defaults.call_timeout_secs
        } else {
            self.call_timeout_secs
        };

        let backoff = if base == 0 {
            Backoff::None
        } else {
            Backoff::Exponential {
                base: Duration::from_millis(base),
                max: Duration::from_millis(max),
            }
        };

        let settings = GatewaySettings {
            cache_enabled: self.cache_enabled,
            cache_capacity,
            retry: RetryPolicy::new(self.max_retries + 1, backoff),
            call_timeout: Duration::from_secs(call_timeout_secs),
        };
        (settings, issues)
    }
}
