use chrono::Duration;

use crate::config::Environment;

/// Builds the session cookie attached to successful auth responses.
///
/// The cookie may outlive the token it carries; expiry of the token
/// itself is what ends the session.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    max_age: Duration,
    secure: bool,
}

impl CookiePolicy {
    pub fn new(expires_in_days: i64, environment: Environment) -> Self {
        Self {
            max_age: Duration::days(expires_in_days),
            secure: environment == Environment::Production,
        }
    }

    /// Render the `Set-Cookie` value for a session token.
    ///
    /// The cookie is `HttpOnly` and scoped to the whole site; `Secure` is
    /// added in production.
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "jwt={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            token,
            self.max_age.num_seconds()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}
