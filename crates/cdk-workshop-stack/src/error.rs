//! Stack synthesis error types

use thiserror::Error;

/// Errors raised while declaring, synthesizing or writing a stack
#[derive(Error, Debug)]
pub enum StackError {
    #[error("Duplicate id in stack: {0}")]
    DuplicateId(String),

    #[error("'{from}' references unknown id '{to}'")]
    UnknownReference { from: String, to: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Invalid configuration for '{id}': {message}")]
    InvalidConfig { id: String, message: String },

    #[error("Assembly error: {0}")]
    AssemblyError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StackError {
    pub fn invalid(id: impl Into<String>, message: impl Into<String>) -> Self {
        StackError::InvalidConfig {
            id: id.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StackError>;
