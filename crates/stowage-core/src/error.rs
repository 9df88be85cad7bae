//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Values merge error: {message}")]
    ValuesMerge { message: String },

    #[error("Missing required value: {path}")]
    MissingValue { path: String },

    #[error("Value at '{path}' has the wrong type (expected {expected})")]
    WrongType { path: String, expected: &'static str },

    #[error("backup and restore cannot be enabled simultaneously")]
    ConflictingOperations,

    #[error("Invalid value at '{path}': {message}")]
    InvalidValue { path: String, message: String },

    #[error("Invalid settings: {message}")]
    InvalidSettings { message: String },
}

impl CoreError {
    /// Whether this error comes from the release configuration rather than I/O or parsing
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CoreError::MissingValue { .. }
                | CoreError::WrongType { .. }
                | CoreError::ConflictingOperations
                | CoreError::InvalidValue { .. }
                | CoreError::InvalidSettings { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
