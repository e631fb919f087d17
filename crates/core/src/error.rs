//! Error types for the study assistant.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using the assistant's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the study assistant.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Structured Output Errors
    // =========================================================================
    #[error("Model output for {schema} failed validation after {attempts} attempts: {last_error}")]
    ValidationExhausted {
        schema: &'static str,
        attempts: usize,
        last_error: String,
    },

    // =========================================================================
    // Tool Errors
    // =========================================================================
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    // =========================================================================
    // Memory Store Errors
    // =========================================================================
    #[error("Persistence error: {0}")]
    Persistence(String),

    // =========================================================================
    // Model Gateway Errors
    // =========================================================================
    #[error("Model provider error: {0}")]
    ModelProvider(String),

    // =========================================================================
    // Configuration & Template Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template rendering error: {0}")]
    Template(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures raised by the specialist tools.
///
/// Specialists recover from these locally; they never fail a request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Invalid arithmetic expression: {0}")]
    InvalidExpression(String),

    #[error("Code execution timed out after {0:?}")]
    ExecutionTimeout(Duration),

    #[error("Code execution failed: {0}")]
    ExecutionError(String),

    #[error("Unparseable duration: {0}")]
    UnparseableDuration(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

impl Error {
    /// Create a persistence error.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a model provider error.
    pub fn model_provider(msg: impl Into<String>) -> Self {
        Self::ModelProvider(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a tool not found error.
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound(name.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error came from a tool and can be recovered by the caller.
    pub fn is_tool_error(&self) -> bool {
        matches!(self, Self::Tool(_) | Self::ToolNotFound(_))
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_exhausted_message() {
        let err = Error::ValidationExhausted {
            schema: "RoutingDecision",
            attempts: 3,
            last_error: "missing field `query_type`".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("RoutingDecision"));
        assert!(msg.contains("3 attempts"));
    }

    #[test]
    fn test_tool_error_is_recoverable() {
        let err: Error = ToolError::UnparseableDuration("someday".into()).into();
        assert!(err.is_tool_error());
        assert!(!Error::persistence("disk full").is_tool_error());
    }
}
