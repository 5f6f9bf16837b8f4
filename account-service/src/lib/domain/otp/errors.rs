use thiserror::Error;

use crate::user::errors::StoreError;

/// Error reported by the outbound mail collaborator.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("Failed to send email: {0}")]
    SendFailed(String),
}

/// Top-level error for all one-time-code operations.
#[derive(Debug, Error)]
pub enum OtpError {
    // Validation and conflict errors
    #[error("Email domain is not eligible for registration: {0}")]
    InvalidEmailDomain(String),

    #[error("Email already registered: {0}")]
    EmailAlreadyRegistered(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Role not configured: {0}")]
    RoleNotConfigured(String),

    // Code lifecycle errors
    #[error("No active code for this email; request a new one to restart the flow")]
    NoActiveOtp,

    #[error("Too many verification attempts; request a new code")]
    TooManyAttempts,

    #[error("Code has expired; request a new one")]
    OtpExpired,

    #[error("Incorrect code")]
    OtpMismatch,

    #[error("Resend not allowed yet")]
    ResendThrottled,

    // Collaborator errors
    #[error("Failed to deliver code: {0}")]
    DeliveryFailed(#[from] MailError),

    #[error("Credential error: {0}")]
    Credential(#[from] auth::CredentialError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
