use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::otp::errors::MailError;
use crate::otp::errors::OtpError;
use crate::otp::models::InitiateOtpCommand;
use crate::otp::models::NewOtpRecord;
use crate::otp::models::OtpIssued;
use crate::otp::models::OtpPurpose;
use crate::otp::models::OtpRecord;
use crate::otp::models::OtpVerification;
use crate::user::errors::StoreError;
use crate::user::models::EmailAddress;

/// Port for the one-time-code lifecycle engine.
#[async_trait]
pub trait OtpServicePort: Send + Sync + 'static {
    /// Start an OTP flow: generate, persist, and deliver a fresh code.
    ///
    /// # Returns
    /// Issuance confirmation carrying the TTL (never the code)
    ///
    /// # Errors
    /// * `InvalidEmailDomain` - Email is not eligible for registration
    /// * `EmailAlreadyRegistered` - Registration for an existing account
    /// * `UserNotFound` - Password reset for an unknown account
    /// * `DeliveryFailed` - Mail delivery failed; the code is invalidated
    async fn initiate(&self, command: InitiateOtpCommand) -> Result<OtpIssued, OtpError>;

    /// Check a submitted code and consume the record on success.
    ///
    /// # Errors
    /// * `NoActiveOtp` - No active record for this (email, purpose)
    /// * `TooManyAttempts` - Attempt ceiling reached
    /// * `OtpExpired` - Record expired
    /// * `OtpMismatch` - Wrong code; the attempt is counted
    async fn verify(
        &self,
        purpose: OtpPurpose,
        email: &EmailAddress,
        code: &str,
    ) -> Result<OtpVerification, OtpError>;

    /// Re-deliver a fresh code for an active flow.
    ///
    /// # Errors
    /// * `NoActiveOtp` - Nothing to resend; the flow must be restarted
    /// * `ResendThrottled` - Resend quota or cooldown not satisfied
    /// * `DeliveryFailed` - Mail delivery failed; the fresh code is invalidated
    async fn resend(&self, purpose: OtpPurpose, email: &EmailAddress)
        -> Result<OtpIssued, OtpError>;
}

/// Persistence operations for one-time-code records.
///
/// The store enforces uniqueness of one active record per (email, purpose):
/// `create` supersedes any prior active record for the pair. Mutations are
/// individually atomic at the storage layer.
#[async_trait]
pub trait OtpStore: Send + Sync + 'static {
    /// Persist a fresh record, superseding any prior active one for the
    /// same (email, purpose) pair.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn create(&self, record: NewOtpRecord) -> Result<OtpRecord, StoreError>;

    /// Retrieve the active (unused) record for an (email, purpose) pair.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn get_active_by_email(
        &self,
        email: &EmailAddress,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpRecord>, StoreError>;

    /// Terminally invalidate a record.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn mark_used(&self, id: Uuid) -> Result<(), StoreError>;

    /// Count one failed verification attempt.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn increment_attempts(&self, id: Uuid) -> Result<(), StoreError>;

    /// Remove records for an (email, purpose) pair.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn delete_by_email(
        &self,
        email: &EmailAddress,
        purpose: OtpPurpose,
    ) -> Result<(), StoreError>;

    /// Persist resend bookkeeping for a record.
    ///
    /// # Errors
    /// * `StoreError` - Store operation failed
    async fn update_resend_info(
        &self,
        id: Uuid,
        resend_count: u32,
        last_resend_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Outbound email delivery for one-time codes.
#[async_trait]
pub trait MailSender: Send + Sync + 'static {
    /// Deliver a code using a purpose-specific template.
    ///
    /// # Errors
    /// * `MailError` - Delivery failed
    async fn send_otp_email(
        &self,
        email: &EmailAddress,
        code: &str,
        template_id: &str,
    ) -> Result<(), MailError>;
}

/// Source of fresh numeric codes.
///
/// A port rather than a direct dependency so tests can pin the generated
/// code.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Generate a numeric code of the requested length.
    fn generate(&self, length: usize) -> String;
}

/// Production code generator backed by the auth crate's CSPRNG generator.
pub struct RandomCodeGenerator {
    inner: auth::OtpGenerator,
}

impl RandomCodeGenerator {
    pub fn new() -> Self {
        Self {
            inner: auth::OtpGenerator::new(),
        }
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, length: usize) -> String {
        self.inner.numeric(length)
    }
}
