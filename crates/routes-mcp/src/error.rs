//! Tool errors
//!
//! Every variant ends up as an `isError` tool result; none of them escape a
//! single tool call.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("{0}")]
    Validation(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Error executing rails routes: {0}")]
    Execution(String),
}

impl ToolError {
    pub fn missing(argument: &str) -> Self {
        Self::Validation(format!("Missing required argument: {}", argument))
    }

    pub fn invalid(argument: &str, detail: impl std::fmt::Display) -> Self {
        Self::Validation(format!("Invalid argument {}: {}", argument, detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ToolError::missing("pattern").to_string(),
            "Missing required argument: pattern"
        );
        assert_eq!(
            ToolError::UnknownTool("nope".into()).to_string(),
            "Unknown tool: nope"
        );
        assert_eq!(
            ToolError::Execution("bin/rails: not found".into()).to_string(),
            "Error executing rails routes: bin/rails: not found"
        );
    }
}
