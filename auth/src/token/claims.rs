use serde::Deserialize;
use serde::Serialize;

/// Claims carried by every issued bearer token.
///
/// The set is closed on purpose: a token names who it was issued for and
/// when, nothing else. Timestamps are Unix seconds, which is the
/// granularity the password-change staleness check compares against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject - the principal identifier the token was issued for.
    pub sub: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,
}
