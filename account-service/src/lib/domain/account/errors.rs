use auth::PasswordError;
use auth::TokenError;
use thiserror::Error;

/// Error for PrincipalId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrincipalIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for Role parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("Unknown role: {0}")]
    Unknown(String),
}

/// Collected field validation failures from request parsing.
///
/// Individual field messages are joined into one client-facing sentence,
/// so a request missing several fields reports all of them at once.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid input data. {}", messages.join(". "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

/// Error for credential store operations
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Duplicate field: {value}. Please use another value")]
    Duplicate { field: String, value: String },

    #[error("Invalid {field}: {value}")]
    Malformed { field: String, value: String },

    #[error("Database error: {0}")]
    Database(String),
}

/// Error for email delivery operations
#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("Email delivery failed: {0}")]
    Delivery(String),
}

/// Top-level error for all account operations.
///
/// This is a closed set: every failure an operation can produce is one of
/// these variants, and the HTTP layer maps them to wire responses with a
/// single exhaustive match. For operational variants the `Display` output
/// is the client-facing message.
#[derive(Debug, Clone, Error)]
pub enum AccountError {
    #[error("Please provide email and password")]
    MissingCredentials,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("You are not logged in. Please log in to get access")]
    NotLoggedIn,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("The user belonging to this token no longer exists")]
    PrincipalGone,

    #[error("User recently changed password. Please login again")]
    StalePassword,

    #[error("Your current password is incorrect")]
    WrongCurrentPassword,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("No user exists with the provided email")]
    UnknownEmail,

    #[error("Token is invalid or has expired")]
    ResetTokenInvalid,

    #[error("Can't find the {0} route on this server")]
    RouteNotFound(String),

    #[error("There was an error sending the email. Try again later")]
    Mail(#[from] MailError),

    #[error("Password error: {0}")]
    Hash(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
