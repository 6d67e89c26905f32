use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::errors::StoreError;
use crate::account::models::EmailAddress;
use crate::account::models::Principal;
use crate::account::models::PrincipalId;
use crate::account::models::Role;
use crate::account::models::SecretHash;
use crate::account::ports::CredentialStore;

pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row shape shared by every query that reads principals.
#[derive(Debug, FromRow)]
struct PrincipalRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    password_hash: String,
    password_changed_at: Option<DateTime<Utc>>,
    reset_token_hash: Option<String>,
    reset_token_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl PrincipalRow {
    fn into_principal(self) -> Result<Principal, StoreError> {
        let email = EmailAddress::new(&self.email).map_err(|_| StoreError::Malformed {
            field: "email".to_string(),
            value: self.email.clone(),
        })?;
        let role = self.role.parse::<Role>().map_err(|_| StoreError::Malformed {
            field: "role".to_string(),
            value: self.role.clone(),
        })?;

        Ok(Principal {
            id: PrincipalId(self.id),
            name: self.name,
            email,
            role,
            password_changed_at: self.password_changed_at,
            reset_token_hash: self.reset_token_hash,
            reset_token_expires_at: self.reset_token_expires_at,
            created_at: self.created_at,
        })
    }

    fn into_credentials(self) -> Result<(Principal, SecretHash), StoreError> {
        let secret_hash = SecretHash::new(self.password_hash.clone());
        Ok((self.into_principal()?, secret_hash))
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn create(
        &self,
        principal: Principal,
        secret_hash: &SecretHash,
    ) -> Result<Principal, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO principals (id, name, email, role, password_hash,
                password_changed_at, reset_token_hash, reset_token_expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(principal.id.0)
        .bind(&principal.name)
        .bind(principal.email.as_str())
        .bind(principal.role.as_str())
        .bind(secret_hash.as_str())
        .bind(principal.password_changed_at)
        .bind(&principal.reset_token_hash)
        .bind(principal.reset_token_expires_at)
        .bind(principal.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some("principals_email_key")
                {
                    return StoreError::Duplicate {
                        field: "email".to_string(),
                        value: principal.email.as_str().to_string(),
                    };
                }
            }
            StoreError::Database(e.to_string())
        })?;

        Ok(principal)
    }

    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<Principal>, StoreError> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, name, email, role, password_hash,
                password_changed_at, reset_token_hash, reset_token_expires_at, created_at
            FROM principals
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(PrincipalRow::into_principal).transpose()
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Principal>, StoreError> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, name, email, role, password_hash,
                password_changed_at, reset_token_hash, reset_token_expires_at, created_at
            FROM principals
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(PrincipalRow::into_principal).transpose()
    }

    async fn find_credentials_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<(Principal, SecretHash)>, StoreError> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, name, email, role, password_hash,
                password_changed_at, reset_token_hash, reset_token_expires_at, created_at
            FROM principals
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(PrincipalRow::into_credentials).transpose()
    }

    async fn find_credentials_by_id(
        &self,
        id: &PrincipalId,
    ) -> Result<Option<(Principal, SecretHash)>, StoreError> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, name, email, role, password_hash,
                password_changed_at, reset_token_hash, reset_token_expires_at, created_at
            FROM principals
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(PrincipalRow::into_credentials).transpose()
    }

    async fn set_reset_token(
        &self,
        id: &PrincipalId,
        fingerprint: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE principals
            SET reset_token_hash = $2, reset_token_expires_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(fingerprint)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_reset_token(&self, id: &PrincipalId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE principals
            SET reset_token_hash = NULL, reset_token_expires_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn redeem_reset_token(
        &self,
        fingerprint: &str,
        new_secret_hash: &SecretHash,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, StoreError> {
        // Fingerprint match, expiry check, password replacement and token
        // clearing happen in one statement, so a token redeems at most once.
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            UPDATE principals
            SET password_hash = $2,
                password_changed_at = $3,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL
            WHERE reset_token_hash = $1
              AND reset_token_expires_at > $3
            RETURNING id, name, email, role, password_hash,
                password_changed_at, reset_token_hash, reset_token_expires_at, created_at
            "#,
        )
        .bind(fingerprint)
        .bind(new_secret_hash.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(PrincipalRow::into_principal).transpose()
    }

    async fn update_password(
        &self,
        id: &PrincipalId,
        current: &SecretHash,
        new: &SecretHash,
        changed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        // Guarded by the digest the caller verified against, so two
        // concurrent changes cannot both win.
        let result = sqlx::query(
            r#"
            UPDATE principals
            SET password_hash = $3,
                password_changed_at = $4,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL
            WHERE id = $1 AND password_hash = $2
            "#,
        )
        .bind(id.0)
        .bind(current.as_str())
        .bind(new.as_str())
        .bind(changed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM principals")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
