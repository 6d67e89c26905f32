use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::account::errors::StoreError;
use crate::account::models::EmailAddress;
use crate::account::models::Principal;
use crate::account::models::PrincipalId;
use crate::account::models::SecretHash;
use crate::account::ports::CredentialStore;

/// In-memory credential store.
///
/// Mirrors the semantics of the Postgres adapter, including the unique
/// email constraint and single-shot reset token redemption. Every
/// operation runs under one lock, so redemption is atomic here too.
/// Backs the HTTP integration tests.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    accounts: Mutex<HashMap<PrincipalId, StoredAccount>>,
}

#[derive(Debug, Clone)]
struct StoredAccount {
    principal: Principal,
    secret_hash: SecretHash,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn accounts(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<PrincipalId, StoredAccount>>, StoreError> {
        self.accounts
            .lock()
            .map_err(|_| StoreError::Database("account store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create(
        &self,
        principal: Principal,
        secret_hash: &SecretHash,
    ) -> Result<Principal, StoreError> {
        let mut accounts = self.accounts()?;

        if accounts
            .values()
            .any(|account| account.principal.email == principal.email)
        {
            return Err(StoreError::Duplicate {
                field: "email".to_string(),
                value: principal.email.as_str().to_string(),
            });
        }

        accounts.insert(
            principal.id,
            StoredAccount {
                principal: principal.clone(),
                secret_hash: secret_hash.clone(),
            },
        );

        Ok(principal)
    }

    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<Principal>, StoreError> {
        let accounts = self.accounts()?;

        Ok(accounts.get(id).map(|account| account.principal.clone()))
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Principal>, StoreError> {
        let accounts = self.accounts()?;

        Ok(accounts
            .values()
            .find(|account| account.principal.email == *email)
            .map(|account| account.principal.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<(Principal, SecretHash)>, StoreError> {
        let accounts = self.accounts()?;

        Ok(accounts
            .values()
            .find(|account| account.principal.email == *email)
            .map(|account| (account.principal.clone(), account.secret_hash.clone())))
    }

    async fn find_credentials_by_id(
        &self,
        id: &PrincipalId,
    ) -> Result<Option<(Principal, SecretHash)>, StoreError> {
        let accounts = self.accounts()?;

        Ok(accounts
            .get(id)
            .map(|account| (account.principal.clone(), account.secret_hash.clone())))
    }

    async fn set_reset_token(
        &self,
        id: &PrincipalId,
        fingerprint: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts()?;

        match accounts.get_mut(id) {
            Some(account) => {
                account.principal.reset_token_hash = Some(fingerprint.to_string());
                account.principal.reset_token_expires_at = Some(expires_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_reset_token(&self, id: &PrincipalId) -> Result<bool, StoreError> {
        let mut accounts = self.accounts()?;

        match accounts.get_mut(id) {
            Some(account) => {
                account.principal.reset_token_hash = None;
                account.principal.reset_token_expires_at = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn redeem_reset_token(
        &self,
        fingerprint: &str,
        new_secret_hash: &SecretHash,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, StoreError> {
        let mut accounts = self.accounts()?;

        let account = accounts.values_mut().find(|account| {
            account.principal.reset_token_hash.as_deref() == Some(fingerprint)
                && account
                    .principal
                    .reset_token_expires_at
                    .map_or(false, |expires_at| expires_at > now)
        });

        match account {
            Some(account) => {
                account.secret_hash = new_secret_hash.clone();
                account.principal.password_changed_at = Some(now);
                account.principal.reset_token_hash = None;
                account.principal.reset_token_expires_at = None;
                Ok(Some(account.principal.clone()))
            }
            None => Ok(None),
        }
    }

    async fn update_password(
        &self,
        id: &PrincipalId,
        current: &SecretHash,
        new: &SecretHash,
        changed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts()?;

        match accounts.get_mut(id) {
            Some(account) if account.secret_hash == *current => {
                account.secret_hash = new.clone();
                account.principal.password_changed_at = Some(changed_at);
                account.principal.reset_token_hash = None;
                account.principal.reset_token_expires_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut accounts = self.accounts()?;

        let deleted = accounts.len() as u64;
        accounts.clear();

        Ok(deleted)
    }
}
