use std::env;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::otp::policy::ResendPolicy;
use crate::user::models::DomainRule;
use crate::user::models::EmailDomainPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub otp: OtpConfig,
    pub jwt: JwtConfig,
    pub tokens: TokenConfig,
    pub mail: MailConfig,
    pub eligibility: EligibilityConfig,
    pub password_reset: PasswordResetConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OtpConfig {
    pub code_length: usize,
    pub expiry_minutes: i64,
    pub max_attempts: u32,
    pub max_resends: u32,
    pub resend_cooldown_seconds: i64,
}

impl OtpConfig {
    /// Build the resend throttling policy the OTP engine consumes.
    pub fn resend_policy(&self) -> ResendPolicy {
        ResendPolicy::new(self.max_resends, self.resend_cooldown_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    /// Keyed pepper for one-way token hashing
    pub pepper: String,
    pub refresh_ttl_days: i64,
    pub reset_ttl_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub registration_template: String,
    pub password_reset_template: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EligibilityRule {
    pub suffix: String,
    pub role: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EligibilityConfig {
    pub rules: Vec<EligibilityRule>,
}

impl EligibilityConfig {
    /// Build the domain policy the engines consume.
    pub fn to_policy(&self) -> EmailDomainPolicy {
        EmailDomainPolicy::new(
            self.rules
                .iter()
                .map(|rule| DomainRule {
                    suffix: rule.suffix.clone(),
                    role: rule.role.clone(),
                })
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PasswordResetConfig {
    /// Environment-dependent frontend base URL (production vs. others)
    pub redirect_base_url: String,
    /// Fixed path suffix appended to the base
    pub redirect_path: String,
}

impl PasswordResetConfig {
    /// Full redirect target handed to the identity delegate.
    pub fn redirect_url(&self) -> String {
        format!(
            "{}{}",
            self.redirect_base_url.trim_end_matches('/'),
            self.redirect_path
        )
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (OTP__MAX_ATTEMPTS, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: OTP__MAX_ATTEMPTS=10 overrides otp.max_attempts
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::models::EmailAddress;

    #[test]
    fn test_redirect_url_joins_base_and_path() {
        let config = PasswordResetConfig {
            redirect_base_url: "https://app.example.edu/".to_string(),
            redirect_path: "/reset-password".to_string(),
        };

        assert_eq!(
            config.redirect_url(),
            "https://app.example.edu/reset-password"
        );
    }

    #[test]
    fn test_eligibility_rules_become_policy() {
        let config = EligibilityConfig {
            rules: vec![EligibilityRule {
                suffix: "student.example.edu".to_string(),
                role: "mahasiswa".to_string(),
            }],
        };

        let policy = config.to_policy();
        let email = EmailAddress::new("new@student.example.edu".to_string()).unwrap();

        assert_eq!(policy.role_for(&email), Some("mahasiswa"));
    }
}
