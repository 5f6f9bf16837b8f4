use rand::rngs::OsRng;
use rand::Rng;

/// Generator for numeric one-time codes.
///
/// Each digit is drawn independently from the operating system CSPRNG, so
/// the code carries no structure beyond its length. Leading zeros are valid.
pub struct OtpGenerator;

impl OtpGenerator {
    /// Create a new code generator instance.
    pub fn new() -> Self {
        Self
    }

    /// Generate a numeric code of the requested length.
    ///
    /// # Arguments
    /// * `length` - Number of digits in the code
    pub fn numeric(&self, length: usize) -> String {
        let mut rng = OsRng;
        (0..length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

impl Default for OtpGenerator {
    fn default() -> Self {
        Self::new()
    }
}
