//! Capability names reserved by the agent loop.

/// Invoking this capability finishes the agent immediately.
pub const TERMINATE: &str = "terminate";

/// All reserved names. Scoped capability sets always keep these reachable.
pub const RESERVED_NAMES: &[&str] = &[TERMINATE];

/// Check whether a capability name is reserved.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Check whether invoking `name` ends the agent loop.
pub fn is_terminate(name: &str) -> bool {
    name == TERMINATE
}
