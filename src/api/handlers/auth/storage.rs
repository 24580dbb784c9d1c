//! Postgres session repository.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::session::{SessionRecord, SessionRepository};
use crate::api::handlers::is_unique_violation;

#[derive(Clone, Debug)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn insert(&self, token_hash: &[u8], user_id: i64) -> Result<bool> {
        let query = "INSERT INTO sessions (token_hash, user_id) VALUES ($1, $2)";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err).context("failed to insert session"),
        }
    }

    async fn find(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>> {
        let query = r"
            SELECT user_id, EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix
            FROM sessions
            WHERE token_hash = $1
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session")?;

        Ok(row.map(|row| SessionRecord {
            user_id: row.get("user_id"),
            created_at_unix: row.get("created_at_unix"),
        }))
    }

    async fn delete(&self, token_hash: &[u8]) -> Result<()> {
        // Logout is idempotent; it's fine if no rows are deleted.
        let query = "DELETE FROM sessions WHERE token_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;
        Ok(())
    }

    async fn delete_all(&self, user_id: i64) -> Result<u64> {
        let query = "DELETE FROM sessions WHERE user_id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete user sessions")?;
        Ok(result.rows_affected())
    }
}
