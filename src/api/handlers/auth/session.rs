//! Session lifecycle: issue, resolve and revoke bearer tokens.
//!
//! Flow Overview: `create` mints a random token and stores only its SHA-256;
//! `lookup` hashes the presented token and resolves it to a user, dropping the
//! row on the spot if it outlived the TTL; `revoke` and `revoke_all` delete
//! rows and are idempotent. Nothing is cached in process, so a revocation is
//! visible to the very next lookup from any worker.

use anyhow::anyhow;
use async_trait::async_trait;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use tracing::debug;

use super::utils::{generate_session_token, hash_session_token};

const CREATE_ATTEMPTS: usize = 3;

/// A resolved session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at_unix: i64,
}

/// Row shape returned by a [`SessionRepository`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: i64,
    pub created_at_unix: i64,
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// Token unknown or expired.
    #[error("session not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Persistence for sessions, keyed by token hash.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a new session. Returns `false` if the hash is already taken.
    async fn insert(&self, token_hash: &[u8], user_id: i64) -> anyhow::Result<bool>;

    async fn find(&self, token_hash: &[u8]) -> anyhow::Result<Option<SessionRecord>>;

    /// Delete one session; deleting a missing row is not an error.
    async fn delete(&self, token_hash: &[u8]) -> anyhow::Result<()>;

    /// Delete every session of a user; returns the number of rows removed.
    async fn delete_all(&self, user_id: i64) -> anyhow::Result<u64>;
}

/// Session service used by the auth gate and the user handlers.
#[derive(Clone)]
pub struct Sessions {
    repository: Arc<dyn SessionRepository>,
    ttl_seconds: i64,
}

impl std::fmt::Debug for Sessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sessions")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl Sessions {
    /// `ttl_seconds <= 0` disables expiry.
    #[must_use]
    pub fn new(repository: Arc<dyn SessionRepository>, ttl_seconds: i64) -> Self {
        Self {
            repository,
            ttl_seconds,
        }
    }

    /// Issue a new token for `user_id`.
    ///
    /// # Errors
    /// Returns [`SessionError::Storage`] if the token cannot be generated or persisted.
    pub async fn create(&self, user_id: i64) -> Result<String, SessionError> {
        for _ in 0..CREATE_ATTEMPTS {
            let token = generate_session_token()?;
            let token_hash = hash_session_token(&token);
            if self.repository.insert(&token_hash, user_id).await? {
                return Ok(token);
            }
            debug!("session token collision, retrying");
        }

        Err(anyhow!("failed to generate unique session token").into())
    }

    /// Resolve a token into its session.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the token is unknown or expired,
    /// [`SessionError::Storage`] if the repository fails.
    pub async fn lookup(&self, token: &str) -> Result<Session, SessionError> {
        let token_hash = hash_session_token(token);
        let Some(record) = self.repository.find(&token_hash).await? else {
            return Err(SessionError::NotFound);
        };

        if self.is_expired(record.created_at_unix, now_unix()) {
            self.repository.delete(&token_hash).await?;
            return Err(SessionError::NotFound);
        }

        Ok(Session {
            token: token.to_string(),
            user_id: record.user_id,
            created_at_unix: record.created_at_unix,
        })
    }

    /// Revoke a single token.
    ///
    /// # Errors
    /// Returns [`SessionError::Storage`] if the repository fails.
    pub async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        let token_hash = hash_session_token(token);
        self.repository.delete(&token_hash).await?;
        Ok(())
    }

    /// Revoke every token issued to `user_id`.
    ///
    /// # Errors
    /// Returns [`SessionError::Storage`] if the repository fails.
    pub async fn revoke_all(&self, user_id: i64) -> Result<(), SessionError> {
        let removed = self.repository.delete_all(user_id).await?;
        debug!("revoked {removed} sessions for user {user_id}");
        Ok(())
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    fn is_expired(&self, created_at_unix: i64, now_unix: i64) -> bool {
        self.ttl_seconds > 0 && now_unix.saturating_sub(created_at_unix) >= self.ttl_seconds
    }
}

pub(crate) fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}
