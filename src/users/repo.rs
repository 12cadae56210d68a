use std::{future::Future, time::Duration};

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use super::repo_types::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("store call timed out")]
    Timeout,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence seam for user records. Implementations must be safe to share
/// across concurrent requests and must reject a second record with the same
/// email with `StoreError::DuplicateEmail`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users, newest first.
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    /// `None` when no record has `id`.
    async fn update_password(&self, id: Uuid, password_hash: &str)
        -> Result<Option<User>, StoreError>;
    /// `false` when no record has `id`.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn close(&self);
}

/// PostgreSQL-backed store. Email uniqueness comes from the `users_email_key` index.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    async fn timed<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        let outcome = tokio::time::timeout(self.timeout, fut).await.ok();
        classify(op, self.timeout, outcome)
    }
}

/// Maps a store call outcome to `StoreError`; `None` means the call timed out.
fn classify<T>(
    op: &'static str,
    timeout: Duration,
    outcome: Option<Result<T, sqlx::Error>>,
) -> Result<T, StoreError> {
    match outcome {
        Some(Ok(v)) => Ok(v),
        Some(Err(sqlx::Error::Database(e))) if e.is_unique_violation() => {
            Err(StoreError::DuplicateEmail)
        }
        Some(Err(e)) => {
            error!(error = %e, op, "store call failed");
            Err(StoreError::Database(e))
        }
        None => {
            error!(op, timeout_ms = timeout.as_millis() as u64, "store call timed out");
            Err(StoreError::Timeout)
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        self.timed(
            "list",
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, first_name, last_name, email, password_hash, created_at
                FROM users
                ORDER BY created_at DESC
                "#,
            )
            .fetch_all(&self.db),
        )
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.timed(
            "find_by_id",
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, first_name, last_name, email, password_hash, created_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.timed(
            "find_by_email",
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, first_name, last_name, email, password_hash, created_at
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        self.timed(
            "insert",
            sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (id, first_name, last_name, email, password_hash)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, first_name, last_name, email, password_hash, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        self.timed(
            "update_password",
            sqlx::query_as::<_, User>(
                r#"
                UPDATE users SET password_hash = $2
                WHERE id = $1
                RETURNING id, first_name, last_name, email, password_hash, created_at
                "#,
            )
            .bind(id)
            .bind(password_hash)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = self
            .timed(
                "delete",
                sqlx::query("DELETE FROM users WHERE id = $1")
                    .bind(id)
                    .execute(&self.db),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
