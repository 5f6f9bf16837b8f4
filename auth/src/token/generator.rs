use rand::rngs::OsRng;
use rand::RngCore;

/// Generator for opaque session tokens.
///
/// Tokens are 32 bytes from the operating system CSPRNG, hex-encoded,
/// giving 256 bits of entropy per token.
pub struct TokenGenerator;

impl TokenGenerator {
    const TOKEN_BYTES: usize = 32;

    /// Create a new token generator instance.
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh opaque token.
    ///
    /// # Returns
    /// Hex-encoded random token string
    pub fn generate(&self) -> String {
        let mut bytes = [0u8; Self::TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}
