use std::sync::Arc;

use async_trait::async_trait;
use auth::reset;
use auth::ResetSecret;
use auth::TokenError;
use auth::TokenService;
use chrono::Duration;
use chrono::Utc;

use crate::account::errors::AccountError;
use crate::account::models::ChangePasswordCommand;
use crate::account::models::EmailAddress;
use crate::account::models::LoginCommand;
use crate::account::models::Mail;
use crate::account::models::Principal;
use crate::account::models::PrincipalId;
use crate::account::models::ResetPasswordCommand;
use crate::account::models::SecretHash;
use crate::account::models::Session;
use crate::account::models::SignupCommand;
use crate::account::ports::AccountServicePort;
use crate::account::ports::CredentialStore;
use crate::account::ports::Mailer;

/// Domain service implementation for account operations.
///
/// Concrete implementation of AccountServicePort with dependency injection.
pub struct AccountService<CS, M>
where
    CS: CredentialStore,
    M: Mailer,
{
    store: Arc<CS>,
    mailer: Arc<M>,
    password_hasher: auth::PasswordHasher,
    tokens: TokenService,
    reset_token_ttl: Duration,
    public_url: String,
}

impl<CS, M> AccountService<CS, M>
where
    CS: CredentialStore,
    M: Mailer,
{
    /// Create a new account service with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Credential persistence implementation
    /// * `mailer` - Email delivery implementation
    /// * `tokens` - Signed-token issuer and verifier
    /// * `reset_token_ttl` - How long a reset token stays redeemable
    /// * `public_url` - Base URL embedded in reset emails
    ///
    /// # Returns
    /// Configured account service instance
    pub fn new(
        store: Arc<CS>,
        mailer: Arc<M>,
        tokens: TokenService,
        reset_token_ttl: Duration,
        public_url: String,
    ) -> Self {
        Self {
            store,
            mailer,
            password_hasher: auth::PasswordHasher::new(),
            tokens,
            reset_token_ttl,
            public_url,
        }
    }

    fn issue_session(&self, principal: Principal) -> Result<Session, AccountError> {
        let token = self.tokens.issue(&principal.id.to_string())?;
        Ok(Session { token, principal })
    }
}

#[async_trait]
impl<CS, M> AccountServicePort for AccountService<CS, M>
where
    CS: CredentialStore,
    M: Mailer,
{
    async fn signup(&self, command: SignupCommand) -> Result<Session, AccountError> {
        let secret_hash = SecretHash::new(self.password_hasher.hash(&command.password)?);

        let principal = Principal {
            id: PrincipalId::new(),
            name: command.name,
            email: command.email,
            role: command.role,
            password_changed_at: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
        };

        let created = self.store.create(principal, &secret_hash).await?;

        self.issue_session(created)
    }

    async fn login(&self, command: LoginCommand) -> Result<Session, AccountError> {
        let email = match EmailAddress::new(&command.email) {
            Ok(email) => email,
            // An address that does not parse cannot match any account.
            Err(_) => return Err(AccountError::InvalidCredentials),
        };

        let (principal, secret_hash) = self
            .store
            .find_credentials_by_email(&email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !self
            .password_hasher
            .verify(&command.password, secret_hash.as_str())?
        {
            return Err(AccountError::InvalidCredentials);
        }

        self.issue_session(principal)
    }

    async fn authenticate(&self, bearer_token: &str) -> Result<Principal, AccountError> {
        let claims = self.tokens.verify(bearer_token)?;

        let id = PrincipalId::from_string(&claims.sub)
            .map_err(|e| AccountError::Token(TokenError::Invalid(e.to_string())))?;

        let principal = self
            .store
            .find_by_id(&id)
            .await?
            .ok_or(AccountError::PrincipalGone)?;

        if principal.password_changed_after(claims.iat) {
            return Err(AccountError::StalePassword);
        }

        Ok(principal)
    }

    async fn change_password(
        &self,
        id: &PrincipalId,
        command: ChangePasswordCommand,
    ) -> Result<Session, AccountError> {
        let (principal, current_hash) = self
            .store
            .find_credentials_by_id(id)
            .await?
            .ok_or(AccountError::PrincipalGone)?;

        if !self
            .password_hasher
            .verify(&command.current_password, current_hash.as_str())?
        {
            return Err(AccountError::WrongCurrentPassword);
        }

        let new_hash = SecretHash::new(self.password_hasher.hash(&command.new_password)?);
        let changed_at = Utc::now();

        let replaced = self
            .store
            .update_password(id, &current_hash, &new_hash, changed_at)
            .await?;
        if !replaced {
            // The digest moved between read and write; the password we
            // verified is no longer the current one.
            return Err(AccountError::WrongCurrentPassword);
        }

        let principal = Principal {
            password_changed_at: Some(changed_at),
            reset_token_hash: None,
            reset_token_expires_at: None,
            ..principal
        };

        // Issued after changed_at, so the fresh session is not itself stale.
        self.issue_session(principal)
    }

    async fn forgot_password(&self, email: &str) -> Result<(), AccountError> {
        let email = match EmailAddress::new(email) {
            Ok(email) => email,
            Err(_) => return Err(AccountError::UnknownEmail),
        };

        let principal = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AccountError::UnknownEmail)?;

        let secret = ResetSecret::generate();
        let expires_at = Utc::now() + self.reset_token_ttl;

        let stored = self
            .store
            .set_reset_token(&principal.id, &secret.fingerprint, expires_at)
            .await?;
        if !stored {
            return Err(AccountError::UnknownEmail);
        }

        let reset_url = format!("{}/auth/reset-password/{}", self.public_url, secret.raw);
        let mail = Mail {
            to: principal.email.clone(),
            subject: format!(
                "Your password reset token (valid only for {} mins)",
                self.reset_token_ttl.num_minutes()
            ),
            body: format!(
                "Forgot your password? Submit a PATCH request with your new password and \
                 password confirmation to: {}.\nIf you didn't forget your password, please \
                 ignore this email.",
                reset_url
            ),
        };

        if let Err(delivery) = self.mailer.send(mail).await {
            // A reset secret must not stay live if its owner was never
            // told about it.
            if let Err(e) = self.store.clear_reset_token(&principal.id).await {
                tracing::error!(
                    principal_id = %principal.id,
                    error = %e,
                    "Failed to revoke reset token after delivery failure"
                );
            }
            return Err(AccountError::Mail(delivery));
        }

        Ok(())
    }

    async fn reset_password(
        &self,
        raw_token: &str,
        command: ResetPasswordCommand,
    ) -> Result<Session, AccountError> {
        let fingerprint = reset::fingerprint(raw_token);
        let new_hash = SecretHash::new(self.password_hasher.hash(&command.password)?);

        let principal = self
            .store
            .redeem_reset_token(&fingerprint, &new_hash, Utc::now())
            .await?
            .ok_or(AccountError::ResetTokenInvalid)?;

        self.issue_session(principal)
    }

    async fn purge_principals(&self) -> Result<u64, AccountError> {
        let deleted = self.store.delete_all().await?;

        tracing::warn!(deleted, "All accounts purged");

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::DateTime;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::account::errors::MailError;
    use crate::account::errors::StoreError;
    use crate::account::models::Role;

    const TEST_SECRET: &[u8] = b"test-secret-key-for-token-signing-32-bytes!";

    // Define mocks in the test module using mockall
    mock! {
        pub TestCredentialStore {}

        #[async_trait]
        impl CredentialStore for TestCredentialStore {
            async fn create(&self, principal: Principal, secret_hash: &SecretHash) -> Result<Principal, StoreError>;
            async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<Principal>, StoreError>;
            async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Principal>, StoreError>;
            async fn find_credentials_by_email(&self, email: &EmailAddress) -> Result<Option<(Principal, SecretHash)>, StoreError>;
            async fn find_credentials_by_id(&self, id: &PrincipalId) -> Result<Option<(Principal, SecretHash)>, StoreError>;
            async fn set_reset_token(&self, id: &PrincipalId, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<bool, StoreError>;
            async fn clear_reset_token(&self, id: &PrincipalId) -> Result<bool, StoreError>;
            async fn redeem_reset_token(&self, fingerprint: &str, new_secret_hash: &SecretHash, now: DateTime<Utc>) -> Result<Option<Principal>, StoreError>;
            async fn update_password(&self, id: &PrincipalId, current: &SecretHash, new: &SecretHash, changed_at: DateTime<Utc>) -> Result<bool, StoreError>;
            async fn delete_all(&self) -> Result<u64, StoreError>;
        }
    }

    mock! {
        pub TestMailer {}

        #[async_trait]
        impl Mailer for TestMailer {
            async fn send(&self, mail: Mail) -> Result<(), MailError>;
        }
    }

    fn test_service(
        store: MockTestCredentialStore,
        mailer: MockTestMailer,
    ) -> AccountService<MockTestCredentialStore, MockTestMailer> {
        AccountService::new(
            Arc::new(store),
            Arc::new(mailer),
            TokenService::new(TEST_SECRET, Duration::hours(24)),
            Duration::minutes(10),
            "http://localhost:8080".to_string(),
        )
    }

    fn test_principal(id: PrincipalId) -> Principal {
        Principal {
            id,
            name: "Ann".to_string(),
            email: EmailAddress::new("ann@example.com").unwrap(),
            role: Role::User,
            password_changed_at: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
        }
    }

    fn digest_of(password: &str) -> SecretHash {
        SecretHash::new(auth::PasswordHasher::new().hash(password).unwrap())
    }

    #[tokio::test]
    async fn test_signup_hashes_password_and_issues_token() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        store
            .expect_create()
            .withf(|principal, secret_hash| {
                principal.email.as_str() == "ann@example.com"
                    && principal.password_changed_at.is_none()
                    && secret_hash.as_str().starts_with("$argon2")
            })
            .times(1)
            .returning(|principal, _| Ok(principal));

        let service = test_service(store, mailer);

        let command = SignupCommand::parse(
            Some("Ann".to_string()),
            Some("ann@example.com".to_string()),
            Some("correct-horse".to_string()),
            Some("correct-horse".to_string()),
            None,
        )
        .unwrap();

        let session = service.signup(command).await.unwrap();

        assert_eq!(session.principal.role, Role::User);

        let claims = TokenService::new(TEST_SECRET, Duration::hours(24))
            .verify(&session.token)
            .unwrap();
        assert_eq!(claims.sub, session.principal.id.to_string());
    }

    #[tokio::test]
    async fn test_signup_duplicate_email() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        store.expect_create().times(1).returning(|principal, _| {
            Err(StoreError::Duplicate {
                field: "email".to_string(),
                value: principal.email.as_str().to_string(),
            })
        });

        let service = test_service(store, mailer);

        let command = SignupCommand::parse(
            Some("Ann".to_string()),
            Some("ann@example.com".to_string()),
            Some("correct-horse".to_string()),
            Some("correct-horse".to_string()),
            None,
        )
        .unwrap();

        let result = service.signup(command).await;

        assert!(matches!(
            result.unwrap_err(),
            AccountError::Store(StoreError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        let id = PrincipalId::new();
        store
            .expect_find_credentials_by_email()
            .withf(|email| email.as_str() == "ann@example.com")
            .times(1)
            .returning(move |_| Ok(Some((test_principal(id), digest_of("correct-horse")))));

        let service = test_service(store, mailer);

        let session = service
            .login(LoginCommand::new(
                "Ann@Example.com".to_string(),
                "correct-horse".to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(session.principal.id, id);
        assert!(!session.token.is_empty());
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        store
            .expect_find_credentials_by_email()
            .withf(|email| email.as_str() == "nobody@example.com")
            .returning(|_| Ok(None));
        store
            .expect_find_credentials_by_email()
            .withf(|email| email.as_str() == "ann@example.com")
            .returning(|_| Ok(Some((test_principal(PrincipalId::new()), digest_of("correct-horse")))));

        let service = test_service(store, mailer);

        let unknown_email = service
            .login(LoginCommand::new(
                "nobody@example.com".to_string(),
                "whatever-pass".to_string(),
            ))
            .await
            .unwrap_err();
        let wrong_password = service
            .login(LoginCommand::new(
                "ann@example.com".to_string(),
                "wrong-horse".to_string(),
            ))
            .await
            .unwrap_err();
        let unparseable_email = service
            .login(LoginCommand::new(
                "not-an-email".to_string(),
                "whatever-pass".to_string(),
            ))
            .await
            .unwrap_err();

        assert!(matches!(unknown_email, AccountError::InvalidCredentials));
        assert!(matches!(wrong_password, AccountError::InvalidCredentials));
        assert!(matches!(unparseable_email, AccountError::InvalidCredentials));
        assert_eq!(unknown_email.to_string(), wrong_password.to_string());
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        let id = PrincipalId::new();
        store
            .expect_find_by_id()
            .withf(move |found| *found == id)
            .times(1)
            .returning(move |_| Ok(Some(test_principal(id))));

        let service = test_service(store, mailer);

        let token = TokenService::new(TEST_SECRET, Duration::hours(24))
            .issue(&id.to_string())
            .unwrap();

        let principal = service.authenticate(&token).await.unwrap();

        assert_eq!(principal.id, id);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_garbage_token() {
        let store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        let service = test_service(store, mailer);

        let result = service.authenticate("not-a-token").await;

        assert!(matches!(
            result.unwrap_err(),
            AccountError::Token(TokenError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_principal_gone() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        store.expect_find_by_id().times(1).returning(|_| Ok(None));

        let service = test_service(store, mailer);

        let token = TokenService::new(TEST_SECRET, Duration::hours(24))
            .issue(&PrincipalId::new().to_string())
            .unwrap();

        let result = service.authenticate(&token).await;

        assert!(matches!(result.unwrap_err(), AccountError::PrincipalGone));
    }

    #[tokio::test]
    async fn test_authenticate_stale_after_password_change() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        let id = PrincipalId::new();
        store.expect_find_by_id().times(1).returning(move |_| {
            let mut principal = test_principal(id);
            // Change recorded after any token issued right now.
            principal.password_changed_at = Some(Utc::now() + Duration::seconds(120));
            Ok(Some(principal))
        });

        let service = test_service(store, mailer);

        let token = TokenService::new(TEST_SECRET, Duration::hours(24))
            .issue(&id.to_string())
            .unwrap();

        let result = service.authenticate(&token).await;

        assert!(matches!(result.unwrap_err(), AccountError::StalePassword));
    }

    #[tokio::test]
    async fn test_change_password_success_issues_fresh_session() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        let id = PrincipalId::new();
        store
            .expect_find_credentials_by_id()
            .withf(move |found| *found == id)
            .times(1)
            .returning(move |_| Ok(Some((test_principal(id), digest_of("old-password")))));
        store
            .expect_update_password()
            .withf(|_, _, new, _| new.as_str().starts_with("$argon2"))
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let service = test_service(store, mailer);

        let command = ChangePasswordCommand::parse(
            Some("old-password".to_string()),
            Some("new-password".to_string()),
            Some("new-password".to_string()),
        )
        .unwrap();

        let session = service.change_password(&id, command).await.unwrap();

        assert!(session.principal.password_changed_at.is_some());

        let claims = TokenService::new(TEST_SECRET, Duration::hours(24))
            .verify(&session.token)
            .unwrap();
        assert_eq!(claims.sub, id.to_string());
        // The fresh token postdates the recorded change.
        assert!(!session
            .principal
            .password_changed_after(claims.iat));
    }

    #[tokio::test]
    async fn test_change_password_wrong_current() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        let id = PrincipalId::new();
        store
            .expect_find_credentials_by_id()
            .times(1)
            .returning(move |_| Ok(Some((test_principal(id), digest_of("old-password")))));
        store.expect_update_password().times(0);

        let service = test_service(store, mailer);

        let command = ChangePasswordCommand::parse(
            Some("not-the-old-password".to_string()),
            Some("new-password".to_string()),
            Some("new-password".to_string()),
        )
        .unwrap();

        let result = service.change_password(&id, command).await;

        assert!(matches!(
            result.unwrap_err(),
            AccountError::WrongCurrentPassword
        ));
    }

    #[tokio::test]
    async fn test_change_password_conflict_on_concurrent_change() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        let id = PrincipalId::new();
        store
            .expect_find_credentials_by_id()
            .times(1)
            .returning(move |_| Ok(Some((test_principal(id), digest_of("old-password")))));
        store
            .expect_update_password()
            .times(1)
            .returning(|_, _, _, _| Ok(false));

        let service = test_service(store, mailer);

        let command = ChangePasswordCommand::parse(
            Some("old-password".to_string()),
            Some("new-password".to_string()),
            Some("new-password".to_string()),
        )
        .unwrap();

        let result = service.change_password(&id, command).await;

        assert!(matches!(
            result.unwrap_err(),
            AccountError::WrongCurrentPassword
        ));
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email() {
        let mut store = MockTestCredentialStore::new();
        let mut mailer = MockTestMailer::new();

        store.expect_find_by_email().times(1).returning(|_| Ok(None));
        mailer.expect_send().times(0);

        let service = test_service(store, mailer);

        let result = service.forgot_password("nobody@example.com").await;

        assert!(matches!(result.unwrap_err(), AccountError::UnknownEmail));
    }

    #[tokio::test]
    async fn test_forgot_password_stores_fingerprint_and_mails_raw_secret() {
        let mut store = MockTestCredentialStore::new();
        let mut mailer = MockTestMailer::new();

        let id = PrincipalId::new();
        let stored_fingerprint = Arc::new(Mutex::new(None::<String>));
        let sent_mail = Arc::new(Mutex::new(None::<Mail>));

        store
            .expect_find_by_email()
            .times(1)
            .returning(move |_| Ok(Some(test_principal(id))));

        let fingerprint_slot = Arc::clone(&stored_fingerprint);
        store
            .expect_set_reset_token()
            .withf(move |found, _, expires_at| *found == id && *expires_at > Utc::now())
            .times(1)
            .returning(move |_, fingerprint, _| {
                *fingerprint_slot.lock().unwrap() = Some(fingerprint.to_string());
                Ok(true)
            });

        let mail_slot = Arc::clone(&sent_mail);
        mailer.expect_send().times(1).returning(move |mail| {
            *mail_slot.lock().unwrap() = Some(mail);
            Ok(())
        });

        let service = test_service(store, mailer);

        service.forgot_password("ann@example.com").await.unwrap();

        let fingerprint = stored_fingerprint.lock().unwrap().clone().unwrap();
        let mail = sent_mail.lock().unwrap().clone().unwrap();

        let marker = "/auth/reset-password/";
        let start = mail.body.find(marker).unwrap() + marker.len();
        let raw_secret = &mail.body[start..start + 64];

        // The store saw only the fingerprint; the email carries the raw
        // secret that hashes to it.
        assert_ne!(fingerprint, raw_secret);
        assert_eq!(reset::fingerprint(raw_secret), fingerprint);
        assert!(mail.subject.contains("10 mins"));
    }

    #[tokio::test]
    async fn test_forgot_password_revokes_secret_when_mail_fails() {
        let mut store = MockTestCredentialStore::new();
        let mut mailer = MockTestMailer::new();

        let id = PrincipalId::new();
        store
            .expect_find_by_email()
            .times(1)
            .returning(move |_| Ok(Some(test_principal(id))));
        store
            .expect_set_reset_token()
            .times(1)
            .returning(|_, _, _| Ok(true));
        store
            .expect_clear_reset_token()
            .withf(move |found| *found == id)
            .times(1)
            .returning(|_| Ok(true));

        mailer
            .expect_send()
            .times(1)
            .returning(|_| Err(MailError::Delivery("smtp timeout".to_string())));

        let service = test_service(store, mailer);

        let result = service.forgot_password("ann@example.com").await;

        assert!(matches!(result.unwrap_err(), AccountError::Mail(_)));
    }

    #[tokio::test]
    async fn test_reset_password_success() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        let id = PrincipalId::new();
        let secret = ResetSecret::generate();
        let expected = secret.fingerprint.clone();

        store
            .expect_redeem_reset_token()
            .withf(move |fingerprint, new_hash, _| {
                fingerprint == expected && new_hash.as_str().starts_with("$argon2")
            })
            .times(1)
            .returning(move |_, _, _| {
                let mut principal = test_principal(id);
                principal.password_changed_at = Some(Utc::now());
                Ok(Some(principal))
            });

        let service = test_service(store, mailer);

        let command = ResetPasswordCommand::parse(
            Some("recovered-pass".to_string()),
            Some("recovered-pass".to_string()),
        )
        .unwrap();

        let session = service.reset_password(&secret.raw, command).await.unwrap();

        assert_eq!(session.principal.id, id);
        assert!(!session.token.is_empty());
    }

    #[tokio::test]
    async fn test_reset_password_invalid_token() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        store
            .expect_redeem_reset_token()
            .times(1)
            .returning(|_, _, _| Ok(None));

        let service = test_service(store, mailer);

        let command = ResetPasswordCommand::parse(
            Some("recovered-pass".to_string()),
            Some("recovered-pass".to_string()),
        )
        .unwrap();

        let result = service.reset_password("unknown-token", command).await;

        assert!(matches!(
            result.unwrap_err(),
            AccountError::ResetTokenInvalid
        ));
    }

    #[tokio::test]
    async fn test_purge_principals() {
        let mut store = MockTestCredentialStore::new();
        let mailer = MockTestMailer::new();

        store.expect_delete_all().times(1).returning(|| Ok(3));

        let service = test_service(store, mailer);

        assert_eq!(service.purge_principals().await.unwrap(), 3);
    }
}
