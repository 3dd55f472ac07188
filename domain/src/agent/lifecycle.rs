//! Agent lifecycle state machine

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Lifecycle state of one agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLifecycle {
    #[default]
    Idle,
    Running,
    Finished,
    Error,
}

/// Input to [`AgentLifecycle::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Start,
    Finish,
    Fail,
}

impl AgentLifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentLifecycle::Idle => "idle",
            AgentLifecycle::Running => "running",
            AgentLifecycle::Finished => "finished",
            AgentLifecycle::Error => "error",
        }
    }

    /// `Finished` and `Error` accept no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentLifecycle::Finished | AgentLifecycle::Error)
    }

    /// Pure transition function.
    ///
    /// A failure may also happen before the loop starts (e.g. a rejected
    /// task), so `Idle` accepts `Fail`.
    pub fn transition(self, event: LifecycleEvent) -> Result<AgentLifecycle, DomainError> {
        use AgentLifecycle::*;
        use LifecycleEvent::*;

        match (self, event) {
            (Idle, Start) => Ok(Running),
            (Running, Finish) => Ok(Finished),
            (Idle | Running, Fail) => Ok(Error),
            (from, event) => Err(DomainError::transition(
                from,
                format!("{:?}", event).to_lowercase(),
            )),
        }
    }
}

impl std::fmt::Display for AgentLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
