//! Capability call validation
//!
//! Pure checks of a call against a definition, run before dispatch.

use super::entities::{ToolCall, ToolDefinition};
use super::value_objects::ToolError;

/// Validator for capability calls
pub trait ToolValidator {
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), ToolError>;
}

/// Checks required, unknown and mistyped arguments.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), ToolError> {
        for param in &definition.parameters {
            match call.arguments.get(&param.name) {
                None if param.required => {
                    return Err(ToolError::invalid_argument(format!(
                        "Missing required parameter '{}' for '{}'",
                        param.name, definition.name
                    )));
                }
                Some(value) if !param.accepts(value) => {
                    return Err(ToolError::invalid_argument(format!(
                        "Parameter '{}' for '{}' must be of type {}",
                        param.name, definition.name, param.param_type
                    )));
                }
                _ => {}
            }
        }

        if let Some(unknown) = call
            .arguments
            .keys()
            .find(|arg| !definition.parameters.iter().any(|p| &p.name == *arg))
        {
            return Err(ToolError::invalid_argument(format!(
                "Unknown parameter '{}' for '{}'",
                unknown, definition.name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::ToolParameter;

    fn definition() -> ToolDefinition {
        ToolDefinition::new("update_feature", "flip passes")
            .with_parameter(ToolParameter::new("index", "entry", true).with_type("integer"))
            .with_parameter(ToolParameter::new("note", "free text", false))
    }

    #[test]
    fn test_validator_missing_required() {
        let err = DefaultToolValidator
            .validate(&ToolCall::new("update_feature"), &definition())
            .unwrap_err();
        assert_eq!(err.code, "INVALID_ARGUMENT");
        assert!(err.message.contains("Missing required parameter"));
    }

    #[test]
    fn test_validator_unknown_param() {
        let call = ToolCall::new("update_feature")
            .with_arg("index", 1)
            .with_arg("bogus", "x");
        let err = DefaultToolValidator.validate(&call, &definition()).unwrap_err();
        assert!(err.message.contains("Unknown parameter 'bogus'"));
    }

    #[test]
    fn test_validator_wrong_type() {
        let call = ToolCall::new("update_feature").with_arg("index", "one");
        let err = DefaultToolValidator.validate(&call, &definition()).unwrap_err();
        assert!(err.message.contains("must be of type integer"));
    }

    #[test]
    fn test_validator_valid_call() {
        let call = ToolCall::new("update_feature")
            .with_arg("index", 0)
            .with_arg("note", "ok");
        assert!(DefaultToolValidator.validate(&call, &definition()).is_ok());
    }
}
