use defter_domain::EntityKind;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or missing input; the caller corrects it and tries again.
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: Uuid },
    /// The operation would break a cross-record invariant.
    #[error("Constraint violated: {0}")]
    Constraint(String),
    #[error("Book not found: {0}")]
    BookNotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        CoreError::NotFound { kind, id }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, CoreError::Constraint(_))
    }
}
