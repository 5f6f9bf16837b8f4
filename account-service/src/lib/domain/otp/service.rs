use std::sync::Arc;

use async_trait::async_trait;
use auth::CredentialHasher;
use auth::TokenGenerator;
use auth::TokenHasher;
use chrono::Duration;
use chrono::Utc;

use crate::otp::errors::OtpError;
use crate::otp::models::InitiateOtpCommand;
use crate::otp::models::NewOtpRecord;
use crate::otp::models::OtpIssued;
use crate::otp::models::OtpPurpose;
use crate::otp::models::OtpRecord;
use crate::otp::models::OtpVerification;
use crate::otp::models::ResetGrant;
use crate::otp::policy::ResendPolicy;
use crate::otp::ports::CodeGenerator;
use crate::otp::ports::MailSender;
use crate::otp::ports::OtpServicePort;
use crate::otp::ports::OtpStore;
use crate::session::models::NewResetToken;
use crate::session::ports::ResetTokenStore;
use crate::user::models::EmailAddress;
use crate::user::models::EmailDomainPolicy;
use crate::user::models::User;
use crate::user::models::UserId;
use crate::user::ports::RoleStore;
use crate::user::ports::UserStore;

/// Tunables and policies for the one-time-code lifecycle.
#[derive(Debug, Clone)]
pub struct OtpSettings {
    pub code_length: usize,
    pub expiry_minutes: i64,
    pub max_attempts: u32,
    pub resend: ResendPolicy,
    pub reset_token_ttl_minutes: i64,
    pub registration_template: String,
    pub password_reset_template: String,
    pub eligibility: EmailDomainPolicy,
}

/// One-time-code lifecycle engine.
///
/// Orchestrates generate → persist → deliver → verify → consume for the
/// registration and password-reset flows. Composes store operations only;
/// the store provides atomicity for fetch-active / mark-used / increment.
pub struct OtpService<OS, US, RS, TS, MS, CG>
where
    OS: OtpStore,
    US: UserStore,
    RS: RoleStore,
    TS: ResetTokenStore,
    MS: MailSender,
    CG: CodeGenerator,
{
    otps: Arc<OS>,
    users: Arc<US>,
    roles: Arc<RS>,
    reset_tokens: Arc<TS>,
    mail: Arc<MS>,
    codes: Arc<CG>,
    credential_hasher: CredentialHasher,
    token_hasher: TokenHasher,
    token_generator: TokenGenerator,
    settings: OtpSettings,
}

impl<OS, US, RS, TS, MS, CG> OtpService<OS, US, RS, TS, MS, CG>
where
    OS: OtpStore,
    US: UserStore,
    RS: RoleStore,
    TS: ResetTokenStore,
    MS: MailSender,
    CG: CodeGenerator,
{
    /// Create a new OTP service with injected collaborators.
    ///
    /// # Arguments
    /// * `otps` - Code record persistence
    /// * `users` - User persistence
    /// * `roles` - Role lookup
    /// * `reset_tokens` - Reset grant persistence
    /// * `mail` - Outbound code delivery
    /// * `codes` - Code source (test seam)
    /// * `token_hasher` - Keyed hasher for reset grants
    /// * `settings` - Policies and tunables
    pub fn new(
        otps: Arc<OS>,
        users: Arc<US>,
        roles: Arc<RS>,
        reset_tokens: Arc<TS>,
        mail: Arc<MS>,
        codes: Arc<CG>,
        token_hasher: TokenHasher,
        settings: OtpSettings,
    ) -> Self {
        Self {
            otps,
            users,
            roles,
            reset_tokens,
            mail,
            codes,
            credential_hasher: CredentialHasher::new(),
            token_hasher,
            token_generator: TokenGenerator::new(),
            settings,
        }
    }

    fn template_for(&self, purpose: OtpPurpose) -> &str {
        match purpose {
            OtpPurpose::Registration => &self.settings.registration_template,
            OtpPurpose::PasswordReset => &self.settings.password_reset_template,
        }
    }

    /// Hash the code and persist a fresh record; the store supersedes any
    /// prior active record for the same (email, purpose) pair.
    async fn persist_record(
        &self,
        email: &EmailAddress,
        purpose: OtpPurpose,
        pending_name: Option<String>,
        pending_password_hash: Option<String>,
        code: &str,
    ) -> Result<OtpRecord, OtpError> {
        let code_hash = self.credential_hasher.hash(code)?;

        let record = self
            .otps
            .create(NewOtpRecord {
                email: email.clone(),
                pending_name,
                pending_password_hash,
                code_hash,
                purpose,
                expires_at: Utc::now() + Duration::minutes(self.settings.expiry_minutes),
                max_attempts: self.settings.max_attempts,
            })
            .await?;

        Ok(record)
    }

    /// Deliver the code, fail-closed: a code that was never delivered must
    /// never be checkable, so a delivery failure invalidates the record.
    async fn deliver(&self, record: &OtpRecord, code: &str) -> Result<(), OtpError> {
        if let Err(e) = self
            .mail
            .send_otp_email(&record.email, code, self.template_for(record.purpose))
            .await
        {
            if let Err(mark_err) = self.otps.mark_used(record.id).await {
                tracing::error!(
                    "Failed to invalidate undelivered {} code for {}: {}",
                    record.purpose,
                    record.email,
                    mark_err
                );
            }
            return Err(OtpError::DeliveryFailed(e));
        }

        Ok(())
    }

    /// Create the user row a verified registration code stands for.
    async fn materialize_user(&self, record: &OtpRecord) -> Result<User, OtpError> {
        let role_name = self
            .settings
            .eligibility
            .role_for(&record.email)
            .ok_or_else(|| OtpError::InvalidEmailDomain(record.email.domain().to_string()))?;

        let role = self
            .roles
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| OtpError::RoleNotConfigured(role_name.to_string()))?;

        let name = record
            .pending_name
            .clone()
            .unwrap_or_else(|| record.email.as_str().to_string());

        let user = User {
            id: UserId::new(),
            external_id: None,
            email: record.email.clone(),
            name,
            password_hash: record.pending_password_hash.clone(),
            role_id: Some(role.id),
            active: true,
            created_at: Utc::now(),
        };

        Ok(self.users.create(user).await?)
    }

    /// Issue the single-use grant that authorizes the password change step.
    async fn issue_reset_grant(&self, email: &EmailAddress) -> Result<ResetGrant, OtpError> {
        let reset_token = self.token_generator.generate();
        let token_hash = self.token_hasher.hash(&reset_token);
        let ttl_minutes = self.settings.reset_token_ttl_minutes;

        self.reset_tokens
            .create(NewResetToken {
                email: email.clone(),
                token_hash,
                expires_at: Utc::now() + Duration::minutes(ttl_minutes),
            })
            .await?;

        Ok(ResetGrant {
            reset_token,
            expires_in: ttl_minutes * 60,
        })
    }
}

#[async_trait]
impl<OS, US, RS, TS, MS, CG> OtpServicePort for OtpService<OS, US, RS, TS, MS, CG>
where
    OS: OtpStore,
    US: UserStore,
    RS: RoleStore,
    TS: ResetTokenStore,
    MS: MailSender,
    CG: CodeGenerator,
{
    async fn initiate(&self, command: InitiateOtpCommand) -> Result<OtpIssued, OtpError> {
        let InitiateOtpCommand {
            purpose,
            email,
            name,
            password,
        } = command;

        match purpose {
            OtpPurpose::Registration => {
                if self.settings.eligibility.role_for(&email).is_none() {
                    return Err(OtpError::InvalidEmailDomain(email.domain().to_string()));
                }
                if self.users.find_by_email(&email).await?.is_some() {
                    return Err(OtpError::EmailAlreadyRegistered(email.as_str().to_string()));
                }
            }
            OtpPurpose::PasswordReset => {
                if self.users.find_by_email(&email).await?.is_none() {
                    return Err(OtpError::UserNotFound(email.as_str().to_string()));
                }
            }
        }

        // The plaintext password never rides on the record
        let pending_password_hash = match password {
            Some(password) => Some(self.credential_hasher.hash(&password)?),
            None => None,
        };

        let code = self.codes.generate(self.settings.code_length);
        let record = self
            .persist_record(&email, purpose, name, pending_password_hash, &code)
            .await?;

        self.deliver(&record, &code).await?;

        Ok(OtpIssued {
            expires_in: self.settings.expiry_minutes * 60,
        })
    }

    async fn verify(
        &self,
        purpose: OtpPurpose,
        email: &EmailAddress,
        code: &str,
    ) -> Result<OtpVerification, OtpError> {
        let record = self
            .otps
            .get_active_by_email(email, purpose)
            .await?
            .ok_or(OtpError::NoActiveOtp)?;

        // Attempt ceiling before the hash comparison: exhausted records
        // never yield a fresh timing signal, and the counter stays put.
        if !record.has_attempts_left() {
            return Err(OtpError::TooManyAttempts);
        }

        if record.is_expired(Utc::now()) {
            return Err(OtpError::OtpExpired);
        }

        if !self.credential_hasher.verify(code, &record.code_hash)? {
            self.otps.increment_attempts(record.id).await?;
            return Err(OtpError::OtpMismatch);
        }

        self.otps.mark_used(record.id).await?;

        let outcome = match purpose {
            OtpPurpose::Registration => {
                OtpVerification::Registered(self.materialize_user(&record).await?)
            }
            OtpPurpose::PasswordReset => {
                OtpVerification::ResetVerified(self.issue_reset_grant(email).await?)
            }
        };

        // Cleanup of the consumed record; a failure here is reported but
        // does not undo consumption.
        if let Err(e) = self.otps.delete_by_email(email, purpose).await {
            tracing::warn!(
                "Failed to delete consumed {} code for {}: {}",
                purpose,
                email,
                e
            );
        }

        Ok(outcome)
    }

    async fn resend(
        &self,
        purpose: OtpPurpose,
        email: &EmailAddress,
    ) -> Result<OtpIssued, OtpError> {
        let prior = self
            .otps
            .get_active_by_email(email, purpose)
            .await?
            .ok_or(OtpError::NoActiveOtp)?;

        if !self
            .settings
            .resend
            .can_resend(prior.resend_count, prior.last_resend_at, Utc::now())
        {
            return Err(OtpError::ResendThrottled);
        }

        let code = self.codes.generate(self.settings.code_length);

        // The fresh record carries the pending registration input forward;
        // persisting it supersedes the prior record for this pair.
        let record = self
            .persist_record(
                email,
                purpose,
                prior.pending_name.clone(),
                prior.pending_password_hash.clone(),
                &code,
            )
            .await?;

        self.deliver(&record, &code).await?;

        self.otps
            .update_resend_info(record.id, prior.resend_count + 1, Utc::now())
            .await?;

        Ok(OtpIssued {
            expires_in: self.settings.expiry_minutes * 60,
        })
    }
}
