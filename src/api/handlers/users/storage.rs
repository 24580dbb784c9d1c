//! User persistence.
//!
//! Handlers talk to a [`UserStore`]; [`PgUserStore`] is the Postgres
//! implementation. Timestamps are rendered by Postgres as RFC 3339 UTC strings.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;

use super::super::{
    is_unique_violation,
    patch::{self, KeyPredicate, PatchError},
};
use super::types::{NewUser, UserPatch, UserRecord};

const USER_COLUMNS: &str = r#"id, email, username, bio, image,
    to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
    to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at"#;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Created(UserRecord),
    /// Email or username already taken.
    Conflict,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: &NewUser) -> Result<InsertOutcome>;

    /// The user registered under `email` together with their password digest,
    /// in a single round trip.
    async fn find_credentials(&self, email: &str) -> Result<Option<(UserRecord, String)>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>>;

    async fn password_digest(&self, id: i64) -> Result<Option<String>>;

    async fn email_taken(&self, email: &str) -> Result<bool>;

    async fn username_taken(&self, username: &str) -> Result<bool>;

    /// Apply `patch` to user `id`. Zero matched rows is not an error.
    async fn partial_update(&self, patch: &UserPatch, id: i64) -> Result<u64, PatchError>;

    /// Returns `false` if no such user existed.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Round-trip to the backing store, used by `/health`.
    async fn ping(&self) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, column: &str, value: &str) -> Result<bool> {
        let query = format!("SELECT EXISTS (SELECT 1 FROM users WHERE {column} = $1)");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let exists: bool = sqlx::query_scalar(&query)
            .bind(value)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .with_context(|| format!("failed to check {column} uniqueness"))?;
        Ok(exists)
    }
}

fn user_from_row(row: &PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        bio: row.get("bio"),
        image: row.get("image"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: &NewUser) -> Result<InsertOutcome> {
        let query = format!(
            "INSERT INTO users (email, username, password_digest) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let result = sqlx::query(&query)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_digest)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(row) => Ok(InsertOutcome::Created(user_from_row(&row))),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<(UserRecord, String)>> {
        let query =
            format!("SELECT {USER_COLUMNS}, password_digest FROM users WHERE email = $1 LIMIT 1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user credentials")?;

        Ok(row.map(|row| (user_from_row(&row), row.get("password_digest"))))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn password_digest(&self, id: i64) -> Result<Option<String>> {
        let query = "SELECT password_digest FROM users WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query_scalar::<_, String>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup password digest")
    }

    async fn email_taken(&self, email: &str) -> Result<bool> {
        self.exists("email", email).await
    }

    async fn username_taken(&self, username: &str) -> Result<bool> {
        self.exists("username", username).await
    }

    async fn partial_update(&self, patch: &UserPatch, id: i64) -> Result<u64, PatchError> {
        let statement = patch::build(patch, &KeyPredicate::new("id", id))?;
        statement.execute(&self.pool).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // Sessions and articles go with the row (ON DELETE CASCADE).
        let query = "DELETE FROM users WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete user")?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        let query = "SELECT 1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("database ping failed")?;
        Ok(())
    }
}
