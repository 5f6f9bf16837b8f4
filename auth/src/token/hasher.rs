use hmac::Hmac;
use hmac::Mac;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// Deterministic one-way hasher for opaque tokens.
///
/// Refresh and password-reset tokens are persisted only as keyed
/// HMAC-SHA256 digests; the plaintext is returned to the caller once and
/// never stored. The same token always maps to the same digest, so stores
/// can look records up by hash.
pub struct TokenHasher {
    mac: HmacSha256,
}

impl TokenHasher {
    /// Minimum length accepted for the HMAC key.
    const MIN_KEY_BYTES: usize = 32;

    /// Create a new token hasher keyed with a server-side pepper.
    ///
    /// Construction is fallible: an undersized key is an initialization
    /// error for the process bootstrap to handle, not a panic.
    ///
    /// # Arguments
    /// * `key` - HMAC key (should be stored securely, never in code)
    ///
    /// # Errors
    /// * `KeyTooShort` - Key is shorter than 32 bytes
    pub fn new(key: &[u8]) -> Result<Self, TokenError> {
        if key.len() < Self::MIN_KEY_BYTES {
            return Err(TokenError::KeyTooShort {
                min: Self::MIN_KEY_BYTES,
                actual: key.len(),
            });
        }

        let mac = HmacSha256::new_from_slice(key).map_err(|_| TokenError::KeyTooShort {
            min: Self::MIN_KEY_BYTES,
            actual: key.len(),
        })?;

        Ok(Self { mac })
    }

    /// Hash a token for storage or lookup.
    ///
    /// # Returns
    /// Hex-encoded HMAC-SHA256 digest of the token
    pub fn hash(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a presented token against a stored digest in constant time.
    ///
    /// A malformed stored digest yields false rather than an error; a
    /// digest that cannot decode cannot match.
    pub fn verify(&self, token: &str, stored_hash: &str) -> bool {
        let expected = match hex::decode(stored_hash) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        let computed = mac.finalize().into_bytes();

        computed.as_slice().ct_eq(expected.as_slice()).into()
    }
}
