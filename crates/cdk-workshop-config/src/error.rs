use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config file {path}: {message}")]
    InvalidConfigFile { path: PathBuf, message: String },

    #[error("Context value '{key}' has the wrong type: expected {expected}")]
    InvalidContextValue { key: String, expected: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
