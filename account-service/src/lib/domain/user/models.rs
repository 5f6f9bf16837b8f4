use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::user::errors::EmailError;
use crate::user::errors::UserIdError;

/// User aggregate entity.
///
/// A registered account. Created on first successful registration, or
/// auto-created on first login when the identity provider knows the account
/// but no local row exists yet.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Stable identifier at the external identity provider, when delegated
    pub external_id: Option<String>,
    pub email: EmailAddress,
    pub name: String,
    /// Present only for locally-held credentials
    pub password_hash: Option<String>,
    pub role_id: Option<RoleId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    ///
    /// # Returns
    /// UserId with random UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Arguments
    /// * `s` - UUID string to parse
    ///
    /// # Returns
    /// Parsed UserId
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Role unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleId(pub i32);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Named role assigned to users.
///
/// Roles pre-exist in storage; this core only looks them up, never creates
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Arguments
    /// * `email` - Raw email string
    ///
    /// # Returns
    /// Validated EmailAddress value object
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    /// Get email as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the domain part (after the final `@`).
    pub fn domain(&self) -> &str {
        self.0.rsplit('@').next().unwrap_or("")
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Single eligibility rule: an email domain suffix mapped to a role name.
#[derive(Debug, Clone)]
pub struct DomainRule {
    pub suffix: String,
    pub role: String,
}

/// Email-domain eligibility and role-mapping policy.
///
/// Registration is open only to configured domains; the matched rule also
/// names the role the account receives. Matching is case-insensitive and
/// accepts subdomains of a configured suffix.
#[derive(Debug, Clone)]
pub struct EmailDomainPolicy {
    rules: Vec<DomainRule>,
}

impl EmailDomainPolicy {
    /// Create a policy from ordered rules; the first match wins.
    pub fn new(rules: Vec<DomainRule>) -> Self {
        Self { rules }
    }

    /// Resolve the role name an email is eligible for.
    ///
    /// # Returns
    /// Role name of the first matching rule, None when no rule matches
    pub fn role_for(&self, email: &EmailAddress) -> Option<&str> {
        let domain = email.domain().to_ascii_lowercase();

        self.rules
            .iter()
            .find(|rule| {
                let suffix = rule.suffix.to_ascii_lowercase();
                domain == suffix || domain.ends_with(&format!(".{}", suffix))
            })
            .map(|rule| rule.role.as_str())
    }
}
