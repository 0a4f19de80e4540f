//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for turn-loop operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Remote call exceeded its deadline
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    /// Session was cancelled while waiting on the provider
    #[error("Cancelled")]
    Cancelled,

    /// Provider returned tool-call data that cannot be executed
    #[error("Malformed tool call: {0}")]
    MalformedToolCall(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Writing a document or transcript failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Conversation invariant violated
    #[error("Conversation error: {0}")]
    Conversation(String),

    /// Maximum model calls reached within one turn
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::Timeout(_) | Self::Io(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => "The AI service is currently unavailable. Please try again.".into(),
            Self::Timeout(_) => "The AI service took too long to answer.".into(),
            Self::Cancelled => "The session was cancelled.".into(),
            Self::MalformedToolCall(msg) => format!("The AI requested a tool in an unreadable form: {msg}"),
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::Persistence(msg) => format!("Could not write to disk: {msg}"),
            Self::MaxIterations(_) => "The request took too many steps. Please try a simpler query.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(AgentError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!AgentError::ToolNotFound("divide".into()).is_retryable());
        assert!(!AgentError::MalformedToolCall("empty name".into()).is_retryable());
    }

    #[test]
    fn test_timeout_keeps_sub_second_precision() {
        let err = AgentError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Provider call timed out after 250ms");
    }

    #[test]
    fn test_user_message() {
        let err = AgentError::ToolNotFound("divide".into());
        assert_eq!(err.user_message(), "The tool 'divide' is not available.");
    }
}
