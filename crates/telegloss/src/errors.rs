use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures raised while dispatching a single tool call.
///
/// The agent loop converts these into result strings so one failing call never
/// aborts the rest of the batch.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Marking syntax errors. Everything except `InvalidSyntax` is raised while
/// validating a custom prefix/suffix pair, before it is saved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("Unknown syntax: {0}")]
    InvalidSyntax(String),

    #[error("Both prefix and suffix are required")]
    EmptyField,

    #[error("Prefix and suffix must be {max} characters or less")]
    TooLong { max: usize },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

impl SyntaxError {
    /// True for the errors produced by custom prefix/suffix validation.
    pub fn is_invalid_custom(&self) -> bool {
        !matches!(self, SyntaxError::InvalidSyntax(_))
    }
}

#[derive(Error, Debug)]
pub enum GlossaryError {
    #[error("Term '{0}' already exists")]
    TermExists(String),

    #[error("Term '{0}' not found")]
    TermNotFound(String),

    #[error(
        "Telegraph page update verification failed - content mismatch. \
         The page may not have been updated. Try deleting and recreating the term."
    )]
    VerificationMismatch { path: String },

    #[error(transparent)]
    ExternalService(#[from] anyhow::Error),
}

pub type GlossaryResult<T> = Result<T, GlossaryError>;
