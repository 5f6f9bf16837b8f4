use async_trait::async_trait;
use uuid::Uuid;

use crate::session::errors::IdentityError;
use crate::session::errors::SessionError;
use crate::session::models::AuthSession;
use crate::session::models::IdentitySession;
use crate::session::models::IdentityUser;
use crate::session::models::NewRefreshToken;
use crate::session::models::NewResetToken;
use crate::session::models::RefreshTokenRecord;
use crate::session::models::RegisterCommand;
use crate::session::models::ResetTokenRecord;
use crate::user::errors::StoreError;
use crate::user::models::EmailAddress;
use crate::user::models::UserId;

/// Port for the session engine capability.
///
/// Two variant implementations exist behind this interface: one delegating
/// session issuance to an external identity provider, one issuing and
/// rotating tokens locally. A deployment wires exactly one.
#[async_trait]
pub trait SessionEngine: Send + Sync + 'static {
    /// Register a new account and establish its first session.
    ///
    /// # Errors
    /// * `InvalidEmailDomain` - Email is not eligible
    /// * `EmailAlreadyRegistered` - Local account already exists
    /// * `EmailAlreadyRegisteredUpstream` - Provider-side duplicate
    /// * `RoleNotConfigured` - Mapped role row is missing
    async fn register(&self, command: RegisterCommand) -> Result<AuthSession, SessionError>;

    /// Verify credentials and establish a session.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password (never
    ///   distinguished)
    /// * `AccountNotActivated` - Account exists but is blocked from use
    async fn login(&self, email: &EmailAddress, password: &str)
        -> Result<AuthSession, SessionError>;

    /// Rotate a refresh token into a fresh session.
    ///
    /// The presented token is single-use: it is invalidated by the same
    /// operation that issues its replacement.
    ///
    /// # Errors
    /// * `InvalidRefreshToken` - Unknown, revoked, or expired token
    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, SessionError>;

    /// Revoke the session(s) behind an access token.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Access token does not validate
    async fn logout(&self, access_token: &str) -> Result<(), SessionError>;
}

/// External identity delegate contract.
///
/// The system of record for credentials and session tokens in delegated
/// deployments. All calls are fail-fast with no internal retry.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Create the external identity and mint its first session.
    ///
    /// # Errors
    /// * `EmailTaken` - Provider already knows this email
    /// * `Provider` - Any other provider failure
    async fn register(
        &self,
        name: &str,
        email: &EmailAddress,
        password: &str,
    ) -> Result<IdentitySession, IdentityError>;

    /// Verify credentials and mint a session.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Credentials rejected
    /// * `Provider` - Any other provider failure
    async fn login(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<IdentitySession, IdentityError>;

    /// Rotate a refresh token; the provider invalidates the old token.
    ///
    /// # Errors
    /// * `InvalidToken` - Token unknown, revoked, or expired
    /// * `Provider` - Any other provider failure
    async fn refresh(&self, refresh_token: &str) -> Result<IdentitySession, IdentityError>;

    /// Revoke the provider-side session.
    ///
    /// # Errors
    /// * `Provider` - Provider failure
    async fn logout(&self, access_token: &str) -> Result<(), IdentityError>;

    /// Start a provider-hosted password-reset flow.
    ///
    /// # Errors
    /// * `Provider` - Provider failure
    async fn request_password_reset(
        &self,
        email: &EmailAddress,
        redirect_url: &str,
    ) -> Result<(), IdentityError>;

    /// Delete the external identity.
    ///
    /// # Errors
    /// * `Provider` - Provider failure
    async fn delete_user(&self, external_id: &str) -> Result<(), IdentityError>;

    /// Validate a provider-issued access token.
    ///
    /// # Errors
    /// * `InvalidToken` - Token does not validate
    /// * `Provider` - Any other provider failure
    async fn verify_token(&self, access_token: &str) -> Result<IdentityUser, IdentityError>;
}

/// Persistence operations for locally-issued refresh tokens.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync + 'static {
    /// Persist a fresh token hash.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, StoreError>;

    /// Retrieve a token record by its one-way hash.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn find_by_hash(&self, token_hash: &str)
        -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Revoke a single token.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn revoke(&self, id: Uuid) -> Result<(), StoreError>;

    /// Revoke every token belonging to a user.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn revoke_all_for_user(&self, user_id: &UserId) -> Result<(), StoreError>;
}

/// Persistence operations for single-use password-reset tokens.
#[async_trait]
pub trait ResetTokenStore: Send + Sync + 'static {
    /// Persist a fresh reset token hash.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn create(&self, token: NewResetToken) -> Result<ResetTokenRecord, StoreError>;

    /// Retrieve the active (unused) reset token for an email.
    ///
    /// The presented token is verified against the stored hash in constant
    /// time by the engine; lookup is by owning email, not by hash.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn find_active_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<ResetTokenRecord>, StoreError>;

    /// Consume a reset token.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn mark_used(&self, id: Uuid) -> Result<(), StoreError>;
}
