use thiserror::Error;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error reported by storage collaborators.
///
/// Stores signal "not found" through `Option` return values; this type
/// covers genuine failures. The engines translate it at the orchestration
/// boundary, so a raw store error never reaches a caller verbatim.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Conflicting record already exists: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}
