use serde::Serialize;

use crate::credential::CredentialError;
use crate::credential::CredentialHasher;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::token::TokenError;
use crate::token::TokenGenerator;
use crate::token::TokenHasher;

/// Session token coordinator.
///
/// Combines credential verification with access-token (JWT) and
/// refresh-token issuance. Constructed once at process start and handed to
/// the engines; there is no global state.
pub struct Authenticator {
    credential_hasher: CredentialHasher,
    jwt_handler: JwtHandler,
    token_hasher: TokenHasher,
    token_generator: TokenGenerator,
}

/// Tokens issued for one session.
///
/// The refresh token plaintext appears here exactly once; callers persist
/// only `refresh_token_hash`.
pub struct IssuedTokens {
    /// JWT access token
    pub access_token: String,
    /// Opaque refresh token, returned to the caller once
    pub refresh_token: String,
    /// One-way digest of the refresh token, for storage
    pub refresh_token_hash: String,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("JWT error: {0}")]
    Jwt(#[from] JwtError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// Fails instead of panicking when a key does not meet its minimum
    /// length; the process bootstrap handles the error.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for JWT signing
    /// * `token_key` - Keyed pepper for refresh token hashing
    ///
    /// # Errors
    /// * `Jwt` - JWT secret fails its minimum-length check
    /// * `Token` - Token key fails its minimum-length check
    pub fn new(jwt_secret: &[u8], token_key: &[u8]) -> Result<Self, AuthenticationError> {
        Ok(Self {
            credential_hasher: CredentialHasher::new(),
            jwt_handler: JwtHandler::new(jwt_secret)?,
            token_hasher: TokenHasher::new(token_key)?,
            token_generator: TokenGenerator::new(),
        })
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `CredentialError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, CredentialError> {
        self.credential_hasher.hash(password)
    }

    /// Verify a password against a stored hash.
    ///
    /// # Errors
    /// * `CredentialError` - Stored hash format is invalid
    pub fn verify_password(
        &self,
        password: &str,
        stored_hash: &str,
    ) -> Result<bool, CredentialError> {
        self.credential_hasher.verify(password, stored_hash)
    }

    /// Verify credentials and issue session tokens.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `stored_hash` - Stored password hash
    /// * `claims` - JWT claims for the access token
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `Credential` - Stored hash is malformed
    /// * `Jwt` - Access token generation failed
    pub fn authenticate<T: Serialize>(
        &self,
        password: &str,
        stored_hash: &str,
        claims: &T,
    ) -> Result<IssuedTokens, AuthenticationError> {
        let is_valid = self.credential_hasher.verify(password, stored_hash)?;

        if !is_valid {
            return Err(AuthenticationError::InvalidCredentials);
        }

        self.issue(claims)
    }

    /// Issue session tokens without a credential check.
    ///
    /// For refresh flows, where the presented refresh token has already
    /// been validated against its stored hash.
    ///
    /// # Errors
    /// * `Jwt` - Access token generation failed
    pub fn issue<T: Serialize>(&self, claims: &T) -> Result<IssuedTokens, AuthenticationError> {
        let access_token = self.jwt_handler.encode(claims)?;
        let refresh_token = self.token_generator.generate();
        let refresh_token_hash = self.token_hasher.hash(&refresh_token);

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            refresh_token_hash,
        })
    }

    /// Validate and decode a JWT access token.
    ///
    /// # Errors
    /// * `JwtError` - Token validation or decoding failed
    pub fn validate_token<T: for<'de> serde::Deserialize<'de>>(
        &self,
        token: &str,
    ) -> Result<T, JwtError> {
        self.jwt_handler.decode(token)
    }

    /// Hash an opaque token for storage lookup.
    pub fn hash_token(&self, token: &str) -> String {
        self.token_hasher.hash(token)
    }

    /// Verify an opaque token against a stored digest in constant time.
    pub fn verify_token_hash(&self, token: &str, stored_hash: &str) -> bool {
        self.token_hasher.verify(token, stored_hash)
    }
}
