//! Configuration validation types shared by the loader and the CLI

pub mod validation;

pub use validation::{ConfigIssue, ConfigIssueCode, Severity};
