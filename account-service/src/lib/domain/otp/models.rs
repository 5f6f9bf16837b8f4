use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::user::models::EmailAddress;
use crate::user::models::User;

/// What an outstanding code proves control of the email for.
///
/// At most one active record exists per (email, purpose) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpPurpose {
    Registration,
    PasswordReset,
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtpPurpose::Registration => write!(f, "registration"),
            OtpPurpose::PasswordReset => write!(f, "password-reset"),
        }
    }
}

/// Stored one-time-code record.
///
/// Only the code's hash is persisted. The pending fields capture
/// registration input at initiation time so the user row can be
/// materialized on successful verification.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub id: Uuid,
    pub email: EmailAddress,
    pub pending_name: Option<String>,
    pub pending_password_hash: Option<String>,
    pub code_hash: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub used: bool,
    pub resend_count: u32,
    pub last_resend_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    /// Whether the record may still be checked against a submitted code.
    ///
    /// Checked before any hash comparison so exhausted records never yield
    /// a fresh timing signal.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Wall-clock expiry check; expiry is evaluated at read time, not by
    /// active eviction.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Command to persist a fresh code record.
///
/// The store supersedes any prior active record for the same
/// (email, purpose) pair.
#[derive(Debug, Clone)]
pub struct NewOtpRecord {
    pub email: EmailAddress,
    pub pending_name: Option<String>,
    pub pending_password_hash: Option<String>,
    pub code_hash: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub max_attempts: u32,
}

/// Command to start or restart an OTP flow.
#[derive(Debug)]
pub struct InitiateOtpCommand {
    pub purpose: OtpPurpose,
    pub email: EmailAddress,
    /// Display name captured for later user materialization (registration)
    pub name: Option<String>,
    /// Plaintext password captured at initiation (registration); hashed
    /// before it is carried on the record
    pub password: Option<String>,
}

/// Confirmation returned when a code was issued and delivered.
///
/// Carries the TTL only, never the code itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpIssued {
    pub expires_in: i64,
}

/// Single-use grant issued when a password-reset code verifies.
///
/// The token plaintext appears here exactly once; only its hash is stored.
#[derive(Debug, Clone)]
pub struct ResetGrant {
    pub reset_token: String,
    pub expires_in: i64,
}

/// Outcome of a successful verification.
#[derive(Debug, Clone)]
pub enum OtpVerification {
    /// Registration code verified; the user row now exists
    Registered(User),
    /// Password-reset code verified; the password change is a separate
    /// confirmation step authorized by the grant
    ResetVerified(ResetGrant),
}
