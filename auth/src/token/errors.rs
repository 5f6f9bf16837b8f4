use thiserror::Error;

/// Error type for token hashing operations.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("Token hashing key must be at least {min} bytes, got {actual}")]
    KeyTooShort { min: usize, actual: usize },
}
