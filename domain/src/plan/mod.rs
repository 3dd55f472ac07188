//! Plan domain: goal decomposition into ordered, verifiable steps
//!
//! ```text
//!            begin_attempt          complete_step
//! Pending ─────────────▶ InProgress ─────────────▶ Completed
//!    ▲                      │  │
//!    └──── retry_step ──────┘  └──── fail_step ────▶ Failed
//! ```
//!
//! The only non-monotonic edge is `InProgress → Pending`, used when a step
//! is re-entered for another attempt.

pub mod entities;
pub mod parser;
pub mod policy;
pub mod summary;

pub use entities::{Plan, PlanStatus, Step, StepRecord, StepStatus, StepTransition};
pub use parser::{StepDraft, parse_decomposition};
pub use policy::{DecompositionBounds, FailurePolicy, Fitted};
pub use summary::{PlanSummary, StepOutcome};
