use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::account::errors::EmailError;
use crate::account::errors::PrincipalIdError;
use crate::account::errors::RoleError;
use crate::account::errors::ValidationError;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Account aggregate entity.
///
/// Represents a registered account holder. The stored password digest is
/// deliberately not a field here; lookups that need it return a separate
/// [`SecretHash`] so the digest cannot leak into a response payload.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: PrincipalId,
    pub name: String,
    pub email: EmailAddress,
    pub role: Role,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    /// Whether the password was changed after a token with the given
    /// issued-at timestamp was minted.
    ///
    /// Comparison is on whole seconds, matching token timestamp
    /// granularity, and strict: a change recorded in the same second as
    /// the token does not invalidate it.
    pub fn password_changed_after(&self, token_issued_at: i64) -> bool {
        self.password_changed_at
            .map_or(false, |changed_at| changed_at.timestamp() > token_issued_at)
    }
}

/// Principal unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrincipalId(pub Uuid);

impl PrincipalId {
    /// Generate a new random principal ID.
    ///
    /// # Returns
    /// PrincipalId with random UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a principal ID from string.
    ///
    /// # Arguments
    /// * `s` - UUID string to parse
    ///
    /// # Returns
    /// Parsed PrincipalId
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, PrincipalIdError> {
        Uuid::parse_str(s)
            .map(PrincipalId)
            .map_err(|e| PrincipalIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser. Input is
/// trimmed and lower-cased before validation so lookups and the unique
/// constraint in storage see one canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated, normalized email address.
    ///
    /// # Arguments
    /// * `email` - Raw email string
    ///
    /// # Returns
    /// Validated EmailAddress value object
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: &str) -> Result<Self, EmailError> {
        let normalized = email.trim().to_lowercase();
        email_address::EmailAddress::from_str(&normalized)
            .map(|_| EmailAddress(normalized))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    /// Get email as string slice.
    ///
    /// # Returns
    /// Email string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Access role attached to a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "guide" => Ok(Role::Guide),
            "lead-guide" => Ok(Role::LeadGuide),
            "admin" => Ok(Role::Admin),
            other => Err(RoleError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored password digest.
///
/// Debug output is redacted so the digest never lands in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretHash(String);

impl SecretHash {
    pub fn new(digest: String) -> Self {
        Self(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretHash(<redacted>)")
    }
}

/// A freshly established session: the signed bearer token and the
/// principal it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub principal: Principal,
}

/// Outbound email message handed to the mail collaborator.
#[derive(Debug, Clone)]
pub struct Mail {
    pub to: EmailAddress,
    pub subject: String,
    pub body: String,
}

/// Command to register a new account with validated fields
#[derive(Debug)]
pub struct SignupCommand {
    pub name: String,
    pub email: EmailAddress,
    pub password: String,
    pub role: Role,
}

impl SignupCommand {
    /// Parse raw signup fields, collecting every validation failure.
    ///
    /// # Arguments
    /// * `name` - Display name
    /// * `email` - Raw email string
    /// * `password` - Plain text password (hashed by the service)
    /// * `password_confirm` - Confirmation of the password
    /// * `role` - Optional role, defaults to `user`
    ///
    /// # Errors
    /// * `ValidationError` - One message per failed field
    pub fn parse(
        name: Option<String>,
        email: Option<String>,
        password: Option<String>,
        password_confirm: Option<String>,
        role: Option<String>,
    ) -> Result<Self, ValidationError> {
        let mut messages = Vec::new();

        let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        if name.is_none() {
            messages.push("Please tell us your name".to_string());
        }

        let email = match email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()) {
            Some(raw) => match EmailAddress::new(&raw) {
                Ok(email) => Some(email),
                Err(_) => {
                    messages.push("Please provide a valid email".to_string());
                    None
                }
            },
            None => {
                messages.push("Please provide your email".to_string());
                None
            }
        };

        let password = validated_new_password(
            password.as_deref(),
            password_confirm.as_deref(),
            &mut messages,
        );

        let role = match role.as_deref() {
            Some(raw) => match raw.parse::<Role>() {
                Ok(role) => Some(role),
                Err(_) => {
                    messages.push("Role is either: user, guide, lead-guide, admin".to_string());
                    None
                }
            },
            None => Some(Role::default()),
        };

        match (name, email, password, role) {
            (Some(name), Some(email), Some(password), Some(role)) if messages.is_empty() => {
                Ok(Self {
                    name,
                    email,
                    password,
                    role,
                })
            }
            _ => Err(ValidationError { messages }),
        }
    }
}

/// Command to authenticate with email and password.
///
/// The email is kept raw here: an address that fails to parse cannot
/// match any stored account, and the service reports that the same way
/// as a wrong password.
#[derive(Debug)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

impl LoginCommand {
    pub fn new(email: String, password: String) -> Self {
        Self { email, password }
    }
}

/// Command to change the password of an authenticated principal
#[derive(Debug)]
pub struct ChangePasswordCommand {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordCommand {
    /// Parse raw password change fields, collecting every validation
    /// failure.
    ///
    /// # Errors
    /// * `ValidationError` - One message per failed field
    pub fn parse(
        current_password: Option<String>,
        new_password: Option<String>,
        password_confirm: Option<String>,
    ) -> Result<Self, ValidationError> {
        let mut messages = Vec::new();

        let current_password = current_password.filter(|p| !p.is_empty());
        if current_password.is_none() {
            messages.push("Please provide your current password".to_string());
        }

        let new_password = validated_new_password(
            new_password.as_deref(),
            password_confirm.as_deref(),
            &mut messages,
        );

        match (current_password, new_password) {
            (Some(current_password), Some(new_password)) if messages.is_empty() => Ok(Self {
                current_password,
                new_password,
            }),
            _ => Err(ValidationError { messages }),
        }
    }
}

/// Command to set a new password through a reset token
#[derive(Debug)]
pub struct ResetPasswordCommand {
    pub password: String,
}

impl ResetPasswordCommand {
    /// Parse raw reset fields, collecting every validation failure.
    ///
    /// # Errors
    /// * `ValidationError` - One message per failed field
    pub fn parse(
        password: Option<String>,
        password_confirm: Option<String>,
    ) -> Result<Self, ValidationError> {
        let mut messages = Vec::new();

        let password =
            validated_new_password(password.as_deref(), password_confirm.as_deref(), &mut messages);

        match password {
            Some(password) if messages.is_empty() => Ok(Self { password }),
            _ => Err(ValidationError { messages }),
        }
    }
}

/// Validate a new password and its confirmation, collecting failures.
///
/// Shared by signup, password reset and password change so every path
/// that sets a password enforces the same policy.
fn validated_new_password(
    password: Option<&str>,
    confirmation: Option<&str>,
    messages: &mut Vec<String>,
) -> Option<String> {
    let before = messages.len();

    let password = password.filter(|p| !p.is_empty());
    match password {
        None => messages.push("Please provide a password".to_string()),
        Some(p) if p.chars().count() < MIN_PASSWORD_LENGTH => messages.push(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )),
        Some(_) => {}
    }

    match confirmation {
        None => messages.push("Please confirm your password".to_string()),
        Some(confirmation) => {
            if let Some(p) = password {
                if p != confirmation {
                    messages.push("Passwords are not the same".to_string());
                }
            }
        }
    }

    if messages.len() == before {
        password.map(|p| p.to_string())
    } else {
        None
    }
}
