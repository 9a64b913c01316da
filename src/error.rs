//! Error types for the Tessella model

use thiserror::Error;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Model mutation and registry errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("duplicate library key: {detail}")]
    DuplicateKey { detail: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unsupported operation for {entity}: {operation}")]
    UnsupportedOperation { entity: String, operation: String },

    #[error("invalid version identifier {identifier:?} for scheme {scheme}")]
    InvalidVersionIdentifier { scheme: String, identifier: String },

    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown or stale entity key")]
    UnknownEntity,

    #[error("configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("configuration serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModelError {
    /// Shorthand for the duplicate-key case
    pub fn duplicate(detail: impl Into<String>) -> Self {
        ModelError::DuplicateKey {
            detail: detail.into(),
        }
    }

    /// Shorthand for the invalid-state case
    pub fn invalid_state(detail: impl Into<String>) -> Self {
        ModelError::InvalidState(detail.into())
    }

    /// Shorthand for the unsupported-operation case
    pub fn unsupported(entity: impl Into<String>, operation: impl Into<String>) -> Self {
        ModelError::UnsupportedOperation {
            entity: entity.into(),
            operation: operation.into(),
        }
    }
}
