use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::user::models::EmailAddress;
use crate::user::models::Role;
use crate::user::models::User;
use crate::user::models::UserId;

/// Assembled response for an established session.
///
/// The refresh token plaintext appears here exactly once and is never
/// persisted by this core.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: SessionUser,
}

/// User profile embedded in a session response.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Option<Role>,
}

impl SessionUser {
    /// Assemble a profile from a local user row and an optionally resolved
    /// role.
    pub fn new(user: &User, role: Option<Role>) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.as_str().to_string(),
            name: user.name.clone(),
            role,
        }
    }
}

/// Command to register a new account.
#[derive(Debug)]
pub struct RegisterCommand {
    pub name: String,
    pub email: EmailAddress,
    pub password: String,
}

/// External user info returned by the identity delegate.
#[derive(Debug, Clone)]
pub struct IdentityUser {
    /// Stable identifier at the provider
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

/// Session payload returned by the identity delegate.
#[derive(Debug, Clone)]
pub struct IdentitySession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: IdentityUser,
}

/// Stored refresh token (non-delegated variant).
///
/// Only the one-way hash of the token is persisted.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Command to persist a fresh refresh token hash.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Stored single-use password-reset token.
///
/// Keyed by email rather than user id; the token may predate local user
/// existence.
#[derive(Debug, Clone)]
pub struct ResetTokenRecord {
    pub id: Uuid,
    pub email: EmailAddress,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl ResetTokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Command to persist a fresh reset token hash.
#[derive(Debug, Clone)]
pub struct NewResetToken {
    pub email: EmailAddress,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
