use std::result::Result as StdResult;

use defter_config::ConfigError;
use defter_core::CoreError;
use defter_domain::EntityKind;
use thiserror::Error;
use uuid::Uuid;

/// Unified error type for the store, storage, and configuration layers.
#[derive(Error, Debug)]
pub enum DefterError {
    #[error("Book not loaded")]
    BookNotLoaded,
    #[error("Book not found: {0}")]
    BookNotFound(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: Uuid },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Constraint violated: {0}")]
    Constraint(String),
    #[error("Persistence error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = StdResult<T, DefterError>;

impl DefterError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DefterError::NotFound { .. } | DefterError::BookNotFound(_)
        )
    }
}

impl From<std::io::Error> for DefterError {
    fn from(err: std::io::Error) -> Self {
        DefterError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for DefterError {
    fn from(err: serde_json::Error) -> Self {
        DefterError::StorageError(err.to_string())
    }
}

impl From<CoreError> for DefterError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(message) => DefterError::InvalidInput(message),
            CoreError::NotFound { kind, id } => DefterError::NotFound { kind, id },
            CoreError::Constraint(message) => DefterError::Constraint(message),
            CoreError::BookNotFound(name) => DefterError::BookNotFound(name),
            CoreError::Storage(message) | CoreError::Serde(message) => {
                DefterError::StorageError(message)
            }
            CoreError::Io(err) => DefterError::StorageError(err.to_string()),
        }
    }
}

impl From<ConfigError> for DefterError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(io) => DefterError::StorageError(io.to_string()),
            ConfigError::Serde(message) | ConfigError::Invalid(message) => {
                DefterError::ConfigError(message)
            }
        }
    }
}
