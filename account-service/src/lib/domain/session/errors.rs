use thiserror::Error;

use crate::user::errors::StoreError;

/// Errors reported by the external identity delegate.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    #[error("Email is already registered with the identity provider")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Identity provider error: {0}")]
    Provider(String),
}

/// Top-level error for all session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    // Validation and conflict errors
    #[error("Email domain is not eligible for registration: {0}")]
    InvalidEmailDomain(String),

    #[error("Email already registered: {0}")]
    EmailAlreadyRegistered(String),

    #[error("Email is already registered with the identity provider")]
    EmailAlreadyRegisteredUpstream,

    #[error("Role not configured: {0}")]
    RoleNotConfigured(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    // Credential and token errors; wrong password and unknown email are
    // deliberately indistinguishable to callers
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is not activated")]
    AccountNotActivated,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    // Infrastructure errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Internal(err.to_string())
    }
}

impl From<auth::CredentialError> for SessionError {
    fn from(err: auth::CredentialError) -> Self {
        SessionError::Internal(err.to_string())
    }
}

impl From<auth::AuthenticationError> for SessionError {
    fn from(err: auth::AuthenticationError) -> Self {
        match err {
            auth::AuthenticationError::InvalidCredentials => SessionError::InvalidCredentials,
            other => SessionError::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for SessionError {
    fn from(err: anyhow::Error) -> Self {
        SessionError::Internal(err.to_string())
    }
}
