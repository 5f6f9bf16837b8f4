//! Authentication utilities library
//!
//! Provides reusable authentication infrastructure for account services:
//! - Credential hashing (Argon2id) for passwords and one-time codes
//! - One-way token hashing (keyed HMAC-SHA256) for refresh and reset tokens
//! - Numeric one-time code generation from a CSPRNG
//! - JWT token generation and validation
//! - Session token coordination
//!
//! Each service defines its own ports and adapts these implementations.
//! This avoids coupling services through shared domain logic while reducing
//! code duplication.
//!
//! # Examples
//!
//! ## Credential Hashing
//! ```
//! use auth::CredentialHasher;
//!
//! let hasher = CredentialHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Token Hashing
//! ```
//! use auth::{TokenGenerator, TokenHasher};
//!
//! let hasher = TokenHasher::new(b"token_pepper_at_least_32_bytes_long!").unwrap();
//! let token = TokenGenerator::new().generate();
//! let hash = hasher.hash(&token);
//! assert!(hasher.verify(&token, &hash));
//! ```
//!
//! ## Complete Session Flow
//! ```
//! use auth::{Authenticator, Claims};
//!
//! let auth = Authenticator::new(
//!     b"secret_key_at_least_32_bytes_long!!",
//!     b"token_pepper_at_least_32_bytes_long!",
//! )
//! .unwrap();
//!
//! // Register: hash password
//! let hash = auth.hash_password("password123").unwrap();
//!
//! // Login: verify and issue access + refresh tokens
//! let claims = Claims::for_session("user123", "alice@example.com".to_string(), None, 24);
//! let issued = auth.authenticate("password123", &hash, &claims).unwrap();
//! assert!(!issued.refresh_token.is_empty());
//!
//! // Validate the access token
//! let decoded: Claims = auth.validate_token(&issued.access_token).unwrap();
//! assert_eq!(decoded.sub, Some("user123".to_string()));
//! ```

pub mod authenticator;
pub mod credential;
pub mod jwt;
pub mod otp;
pub mod token;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use authenticator::IssuedTokens;
pub use credential::CredentialError;
pub use credential::CredentialHasher;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use otp::OtpGenerator;
pub use token::TokenError;
pub use token::TokenGenerator;
pub use token::TokenHasher;
