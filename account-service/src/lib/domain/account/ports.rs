use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::account::errors::AccountError;
use crate::account::errors::MailError;
use crate::account::errors::StoreError;
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

/// Port for account domain service operations.
#[async_trait]
pub trait AccountServicePort: Send + Sync + 'static {
    /// Register a new account and establish its first session.
    ///
    /// # Arguments
    /// * `command` - Validated signup command
    ///
    /// # Returns
    /// Session with a signed token and the created principal
    ///
    /// # Errors
    /// * `Store(Duplicate)` - Email is already registered
    /// * `Hash` - Password hashing failed
    /// * `Store(Database)` - Database operation failed
    async fn signup(&self, command: SignupCommand) -> Result<Session, AccountError>;

    /// Authenticate with email and password.
    ///
    /// # Arguments
    /// * `command` - Raw credentials
    ///
    /// # Returns
    /// Session with a signed token and the matched principal
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password,
    ///   indistinguishable by design
    /// * `Store(Database)` - Database operation failed
    async fn login(&self, command: LoginCommand) -> Result<Session, AccountError>;

    /// Resolve a bearer token to its live principal.
    ///
    /// # Arguments
    /// * `bearer_token` - Signed token from the Authorization header
    ///
    /// # Returns
    /// Principal the token was issued for
    ///
    /// # Errors
    /// * `Token` - Signature invalid or token expired
    /// * `PrincipalGone` - Subject no longer exists
    /// * `StalePassword` - Password changed after the token was issued
    async fn authenticate(&self, bearer_token: &str) -> Result<Principal, AccountError>;

    /// Change the password of an authenticated principal.
    ///
    /// # Arguments
    /// * `id` - Principal whose password changes
    /// * `command` - Current and new password
    ///
    /// # Returns
    /// Fresh session; tokens issued before the change are now stale
    ///
    /// # Errors
    /// * `WrongCurrentPassword` - Current password did not verify
    /// * `PrincipalGone` - Principal no longer exists
    /// * `Store(Database)` - Database operation failed
    async fn change_password(
        &self,
        id: &PrincipalId,
        command: ChangePasswordCommand,
    ) -> Result<Session, AccountError>;

    /// Start a password reset: mint a single-use secret and email it.
    ///
    /// Only a fingerprint of the secret is stored; the raw value leaves
    /// the system exclusively inside the reset email.
    ///
    /// # Arguments
    /// * `email` - Raw email string identifying the account
    ///
    /// # Errors
    /// * `UnknownEmail` - No account with this email
    /// * `Mail` - Delivery failed; the stored secret is revoked
    /// * `Store(Database)` - Database operation failed
    async fn forgot_password(&self, email: &str) -> Result<(), AccountError>;

    /// Redeem a reset token and set a new password.
    ///
    /// # Arguments
    /// * `raw_token` - Secret exactly as it appeared in the reset email
    /// * `command` - Validated new password
    ///
    /// # Returns
    /// Fresh session for the recovered account
    ///
    /// # Errors
    /// * `ResetTokenInvalid` - Token unknown, expired or already used,
    ///   indistinguishable by design
    /// * `Store(Database)` - Database operation failed
    async fn reset_password(
        &self,
        raw_token: &str,
        command: ResetPasswordCommand,
    ) -> Result<Session, AccountError>;

    /// Delete every account. Maintenance operation, admin only.
    ///
    /// # Returns
    /// Number of deleted accounts
    ///
    /// # Errors
    /// * `Store(Database)` - Database operation failed
    async fn purge_principals(&self) -> Result<u64, AccountError>;
}

/// Port for credential persistence operations.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Persist a new principal with its password digest.
    ///
    /// # Arguments
    /// * `principal` - Principal to persist
    /// * `secret_hash` - Password digest stored alongside it
    ///
    /// # Returns
    /// The persisted principal
    ///
    /// # Errors
    /// * `Duplicate` - Email is already registered
    /// * `Database` - Database operation failed
    async fn create(
        &self,
        principal: Principal,
        secret_hash: &SecretHash,
    ) -> Result<Principal, StoreError>;

    /// Retrieve a principal by identifier.
    ///
    /// # Returns
    /// The principal, or `None` if no such account exists
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<Principal>, StoreError>;

    /// Retrieve a principal by normalized email.
    ///
    /// # Returns
    /// The principal, or `None` if no such account exists
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn find_by_email(&self, email: &EmailAddress)
        -> Result<Option<Principal>, StoreError>;

    /// Retrieve a principal together with its password digest.
    ///
    /// # Returns
    /// Principal and digest, or `None` if no such account exists
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn find_credentials_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<(Principal, SecretHash)>, StoreError>;

    /// Retrieve a principal together with its password digest.
    ///
    /// # Returns
    /// Principal and digest, or `None` if no such account exists
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn find_credentials_by_id(
        &self,
        id: &PrincipalId,
    ) -> Result<Option<(Principal, SecretHash)>, StoreError>;

    /// Attach a reset token fingerprint and its expiry to a principal.
    ///
    /// Replaces any previous reset token; only the newest one redeems.
    ///
    /// # Returns
    /// `true` if the principal existed and was updated
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn set_reset_token(
        &self,
        id: &PrincipalId,
        fingerprint: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Remove any pending reset token from a principal.
    ///
    /// # Returns
    /// `true` if the principal existed
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn clear_reset_token(&self, id: &PrincipalId) -> Result<bool, StoreError>;

    /// Atomically redeem a reset token: in one statement, match the
    /// fingerprint, check the expiry against `now`, install the new
    /// digest and clear the reset fields.
    ///
    /// Two concurrent redemptions of the same token cannot both succeed.
    ///
    /// # Returns
    /// The updated principal, or `None` if the fingerprint matched no
    /// live token
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn redeem_reset_token(
        &self,
        fingerprint: &str,
        new_secret_hash: &SecretHash,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, StoreError>;

    /// Replace the password digest of a principal, guarded by the digest
    /// the caller verified against. Clears any pending reset token.
    ///
    /// # Returns
    /// `true` if the guard matched and the digest was replaced
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn update_password(
        &self,
        id: &PrincipalId,
        current: &SecretHash,
        new: &SecretHash,
        changed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Delete every stored principal.
    ///
    /// # Returns
    /// Number of deleted rows
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn delete_all(&self) -> Result<u64, StoreError>;
}

/// Port for outbound email delivery.
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Deliver a single message.
    ///
    /// # Errors
    /// * `Delivery` - Message could not be handed off
    async fn send(&self, mail: Mail) -> Result<(), MailError>;
}
