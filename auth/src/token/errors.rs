use thiserror::Error;

/// Error type for token operations.
///
/// Expiry and every other verification failure are distinct variants so
/// callers can surface different messages without inspecting strings.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("Token is expired")]
    Expired,

    #[error("Token is invalid: {0}")]
    Invalid(String),

    #[error("Failed to sign token: {0}")]
    Encoding(String),
}
