use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Argon2;

use super::errors::CredentialError;

/// One-way hasher for user-held secrets.
///
/// Covers both passwords and numeric one-time codes (internally Argon2id
/// with a fresh random salt per hash). Verification goes through the PHC
/// verifier, which compares digests in constant time.
pub struct CredentialHasher;

impl CredentialHasher {
    /// Create a new credential hasher instance.
    ///
    /// # Returns
    /// CredentialHasher configured with secure defaults
    pub fn new() -> Self {
        Self
    }

    /// Hash a plaintext credential.
    ///
    /// # Arguments
    /// * `secret` - Plaintext password or one-time code
    ///
    /// # Returns
    /// PHC string format hash (includes algorithm, parameters, salt, and hash)
    ///
    /// # Errors
    /// * `HashingFailed` - Hashing operation failed
    pub fn hash(&self, secret: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::HashingFailed(e.to_string()))
    }

    /// Verify a credential against a stored hash.
    ///
    /// # Arguments
    /// * `secret` - Plaintext password or one-time code to verify
    /// * `hash` - Stored hash in PHC string format
    ///
    /// # Returns
    /// True if the credential matches, false otherwise
    ///
    /// # Errors
    /// * `VerificationFailed` - Stored hash format is invalid
    pub fn verify(&self, secret: &str, hash: &str) -> Result<bool, CredentialError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            CredentialError::VerificationFailed(format!("Invalid credential hash: {}", e))
        })?;

        let argon2 = Argon2::default();

        Ok(argon2
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new()
    }
}
