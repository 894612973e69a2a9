//! Domain errors for the BookBridge pipeline.

use thiserror::Error;

use super::models::NaturalKey;

/// Domain-level errors that can occur in the pipeline.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No work is stored under this id
    #[error("Work not found: {0}")]
    WorkNotFound(String),

    /// No accepted record exists for this key
    #[error("Simplification not found: {0}")]
    RecordNotFound(NaturalKey),

    /// An item was moved between states the state machine forbids
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// State the item was in
        from: String,
        /// State it was asked to enter
        to: String,
    },

    /// Input or configuration failed a domain check
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The result store failed
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
