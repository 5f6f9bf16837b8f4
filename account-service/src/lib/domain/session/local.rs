use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use auth::Claims;
use chrono::Duration;
use chrono::Utc;

use crate::session::errors::SessionError;
use crate::session::models::AuthSession;
use crate::session::models::NewRefreshToken;
use crate::session::models::RegisterCommand;
use crate::session::models::SessionUser;
use crate::session::ports::RefreshTokenStore;
use crate::session::ports::ResetTokenStore;
use crate::session::ports::SessionEngine;
use crate::user::models::EmailAddress;
use crate::user::models::EmailDomainPolicy;
use crate::user::models::Role;
use crate::user::models::User;
use crate::user::models::UserId;
use crate::user::ports::RoleStore;
use crate::user::ports::UserStore;

/// Settings for the local session engine.
#[derive(Debug, Clone)]
pub struct LocalSessionSettings {
    pub eligibility: EmailDomainPolicy,
    pub access_token_ttl_hours: i64,
    pub refresh_token_ttl_days: i64,
}

/// Session engine variant issuing and rotating tokens locally.
///
/// Credentials are verified against locally-held Argon2 hashes; access
/// tokens are self-signed JWTs and refresh tokens are opaque values whose
/// one-way hashes live in the refresh token store.
pub struct LocalSessionEngine<US, RS, RT, PT>
where
    US: UserStore,
    RS: RoleStore,
    RT: RefreshTokenStore,
    PT: ResetTokenStore,
{
    users: Arc<US>,
    roles: Arc<RS>,
    refresh_tokens: Arc<RT>,
    reset_tokens: Arc<PT>,
    authenticator: Authenticator,
    settings: LocalSessionSettings,
}

impl<US, RS, RT, PT> LocalSessionEngine<US, RS, RT, PT>
where
    US: UserStore,
    RS: RoleStore,
    RT: RefreshTokenStore,
    PT: ResetTokenStore,
{
    /// Create a new local session engine with injected collaborators.
    pub fn new(
        users: Arc<US>,
        roles: Arc<RS>,
        refresh_tokens: Arc<RT>,
        reset_tokens: Arc<PT>,
        authenticator: Authenticator,
        settings: LocalSessionSettings,
    ) -> Self {
        Self {
            users,
            roles,
            refresh_tokens,
            reset_tokens,
            authenticator,
            settings,
        }
    }

    /// Best-effort role resolution for response payloads.
    async fn resolve_role(&self, user: &User) -> Option<Role> {
        let role_id = user.role_id?;

        match self.roles.find_by_id(role_id).await {
            Ok(Some(role)) => Some(role),
            Ok(None) => {
                tracing::warn!("Role {} missing for user {}", role_id, user.id);
                None
            }
            Err(e) => {
                tracing::warn!("Role lookup failed for user {}: {}", user.id, e);
                None
            }
        }
    }

    /// Mint an access token and a fresh refresh token for this user, and
    /// persist the refresh token's hash.
    async fn issue_session(
        &self,
        user: &User,
        role: Option<Role>,
    ) -> Result<AuthSession, SessionError> {
        let claims = Claims::for_session(
            user.id,
            user.email.as_str().to_string(),
            role.as_ref().map(|role| role.name.clone()),
            self.settings.access_token_ttl_hours,
        );

        let issued = self.authenticator.issue(&claims)?;

        self.refresh_tokens
            .create(NewRefreshToken {
                user_id: user.id,
                token_hash: issued.refresh_token_hash,
                expires_at: Utc::now() + Duration::days(self.settings.refresh_token_ttl_days),
            })
            .await?;

        Ok(AuthSession {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            expires_in: self.settings.access_token_ttl_hours * 3600,
            user: SessionUser::new(user, role),
        })
    }

    /// Complete an OTP-verified password reset.
    ///
    /// The grant was issued by the OTP engine on successful code
    /// verification; it is single-use and scoped to the email it was
    /// issued for. Existing sessions do not survive the password change.
    ///
    /// # Errors
    /// * `InvalidResetToken` - Unknown, used, expired, or mismatching grant
    /// * `UserNotFound` - No account behind the email anymore
    pub async fn reset_password(
        &self,
        email: &EmailAddress,
        reset_token: &str,
        new_password: &str,
    ) -> Result<(), SessionError> {
        let record = self
            .reset_tokens
            .find_active_by_email(email)
            .await?
            .ok_or(SessionError::InvalidResetToken)?;

        if record.used || record.is_expired(Utc::now()) {
            return Err(SessionError::InvalidResetToken);
        }

        // Constant-time check of the presented grant against the stored
        // digest
        if !self
            .authenticator
            .verify_token_hash(reset_token, &record.token_hash)
        {
            return Err(SessionError::InvalidResetToken);
        }

        self.reset_tokens.mark_used(record.id).await?;

        let password_hash = self.authenticator.hash_password(new_password)?;

        if !self.users.update_password(email, &password_hash).await? {
            return Err(SessionError::UserNotFound(email.as_str().to_string()));
        }

        // Best-effort revocation of outstanding sessions
        match self.users.find_by_email(email).await {
            Ok(Some(user)) => {
                if let Err(e) = self.refresh_tokens.revoke_all_for_user(&user.id).await {
                    tracing::warn!(
                        "Failed to revoke sessions for {} after password reset: {}",
                        email,
                        e
                    );
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Failed to load {} for session revocation: {}", email, e);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl<US, RS, RT, PT> SessionEngine for LocalSessionEngine<US, RS, RT, PT>
where
    US: UserStore,
    RS: RoleStore,
    RT: RefreshTokenStore,
    PT: ResetTokenStore,
{
    async fn register(&self, command: RegisterCommand) -> Result<AuthSession, SessionError> {
        let RegisterCommand {
            name,
            email,
            password,
        } = command;

        let role_name = self
            .settings
            .eligibility
            .role_for(&email)
            .ok_or_else(|| SessionError::InvalidEmailDomain(email.domain().to_string()))?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(SessionError::EmailAlreadyRegistered(
                email.as_str().to_string(),
            ));
        }

        let role = self
            .roles
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| SessionError::RoleNotConfigured(role_name.to_string()))?;

        let password_hash = self.authenticator.hash_password(&password)?;

        let user = self
            .users
            .create(User {
                id: UserId::new(),
                external_id: None,
                email: email.clone(),
                name,
                password_hash: Some(password_hash),
                role_id: Some(role.id),
                active: true,
                created_at: Utc::now(),
            })
            .await?;

        self.issue_session(&user, Some(role)).await
    }

    async fn login(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> Result<AuthSession, SessionError> {
        // Unknown email and wrong password are deliberately the same error
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(SessionError::InvalidCredentials)?;

        // Delegated accounts hold no local hash and cannot log in here
        let stored_hash = user
            .password_hash
            .as_deref()
            .ok_or(SessionError::InvalidCredentials)?;

        if !self.authenticator.verify_password(password, stored_hash)? {
            return Err(SessionError::InvalidCredentials);
        }

        if !user.active {
            return Err(SessionError::AccountNotActivated);
        }

        let role = self.resolve_role(&user).await;
        self.issue_session(&user, role).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, SessionError> {
        let token_hash = self.authenticator.hash_token(refresh_token);

        let record = self
            .refresh_tokens
            .find_by_hash(&token_hash)
            .await?
            .ok_or(SessionError::InvalidRefreshToken)?;

        if record.revoked || record.is_expired(Utc::now()) {
            return Err(SessionError::InvalidRefreshToken);
        }

        let user = self
            .users
            .find_by_id(&record.user_id)
            .await?
            .ok_or(SessionError::InvalidRefreshToken)?;

        if !user.active {
            return Err(SessionError::AccountNotActivated);
        }

        // Revoke before issuing: a failure mid-rotation leaves the
        // presented token unusable, never reusable.
        self.refresh_tokens.revoke(record.id).await?;

        let role = self.resolve_role(&user).await;
        self.issue_session(&user, role).await
    }

    async fn logout(&self, access_token: &str) -> Result<(), SessionError> {
        let claims: Claims = self
            .authenticator
            .validate_token(access_token)
            .map_err(|_| SessionError::InvalidCredentials)?;

        let subject = claims.sub.ok_or(SessionError::InvalidCredentials)?;
        let user_id =
            UserId::from_string(&subject).map_err(|_| SessionError::InvalidCredentials)?;

        Ok(self.refresh_tokens.revoke_all_for_user(&user_id).await?)
    }
}
