use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use account_service::config::Environment;
use account_service::domain::account::errors::MailError;
use account_service::domain::account::models::Mail;
use account_service::domain::account::ports::Mailer;
use account_service::domain::account::service::AccountService;
use account_service::inbound::http::cookie::CookiePolicy;
use account_service::inbound::http::handlers::ErrorNormalizer;
use account_service::inbound::http::router::create_router;
use account_service::outbound::repositories::InMemoryCredentialStore;
use async_trait::async_trait;
use auth::TokenService;
use chrono::Duration;

pub const TEST_TOKEN_SECRET: &[u8] = b"test-secret-key-for-token-signing-32-bytes!";

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub outbox: Arc<RecordingMailer>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        Self::spawn_with_reset_ttl(Duration::minutes(10)).await
    }

    /// Spawn with a chosen reset token lifetime.
    pub async fn spawn_with_reset_ttl(reset_token_ttl: Duration) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let store = Arc::new(InMemoryCredentialStore::new());
        let outbox = Arc::new(RecordingMailer::new());
        let tokens = TokenService::new(TEST_TOKEN_SECRET, Duration::hours(24));

        let account_service = Arc::new(AccountService::new(
            store,
            Arc::clone(&outbox),
            tokens,
            reset_token_ttl,
            address.clone(),
        ));

        // Production mode: responses carry the normalized client messages.
        let cookies = CookiePolicy::new(90, Environment::Production);
        let errors = ErrorNormalizer::new(Environment::Production);

        let router = create_router(account_service, cookies, errors);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create reqwest client"),
            outbox,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Helper to make PATCH request
    pub fn patch(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.patch(&format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make PATCH request with Bearer token
    pub fn patch_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.patch(path).bearer_auth(token)
    }

    /// Helper to make DELETE request with Bearer token
    pub fn delete_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api_client
            .delete(&format!("{}{}", self.address, path))
            .bearer_auth(token)
    }

    /// Craft a signed token with chosen timestamps, bypassing the
    /// service clock.
    pub fn craft_token(&self, subject: &str, issued_at: i64, expires_at: i64) -> String {
        let claims = serde_json::json!({
            "sub": subject,
            "iat": issued_at,
            "exp": expires_at,
        });

        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(TEST_TOKEN_SECRET),
        )
        .expect("Failed to craft token")
    }
}

/// Mailer double that records every delivery attempt instead of sending.
///
/// Attempts are recorded before the simulated failure check, so tests
/// can observe secrets whose delivery failed.
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Mail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn restore_deliveries(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    pub fn last_mail(&self) -> Option<Mail> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(mail);

        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Delivery("simulated outage".to_string()));
        }

        Ok(())
    }
}

/// Pull the raw reset token out of a dispatched email body.
pub fn extract_reset_token(body: &str) -> String {
    let marker = "/auth/reset-password/";
    let start = body.find(marker).expect("No reset URL in email body") + marker.len();
    body[start..start + 64].to_string()
}
