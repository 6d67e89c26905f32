//! Authentication building blocks
//!
//! Reusable credential infrastructure for the account service:
//! - Password hashing (Argon2id)
//! - Signed bearer tokens with a fixed lifetime
//! - Single-use password-reset secrets and their fingerprints
//!
//! Nothing here touches storage or transport; the service wires these
//! pieces into its own domain behind its ports.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Bearer Tokens
//! ```
//! use auth::TokenService;
//! use chrono::Duration;
//!
//! let tokens = TokenService::new(b"secret_key_at_least_32_bytes_long!", Duration::hours(24));
//! let token = tokens.issue("user123").unwrap();
//! let claims = tokens.verify(&token).unwrap();
//! assert_eq!(claims.sub, "user123");
//! ```
//!
//! ## Reset Secrets
//! ```
//! use auth::reset;
//! use auth::reset::ResetSecret;
//!
//! let secret = ResetSecret::generate();
//! assert_eq!(secret.fingerprint, reset::fingerprint(&secret.raw));
//! ```

pub mod password;
pub mod reset;
pub mod token;

// Re-export commonly used items
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use reset::ResetSecret;
pub use token::Claims;
pub use token::TokenError;
pub use token::TokenService;
