//! Auth state and configuration.

use std::sync::Arc;

use super::{
    allow_list::AllowList,
    password::Credentials,
    session::{SessionRepository, Sessions},
};

/// 30 days.
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: i64,
    allow_list: AllowList,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            allow_list: AllowList::default_routes(),
        }
    }

    /// `seconds <= 0` disables session expiry.
    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_allow_list(mut self, allow_list: AllowList) -> Self {
        self.allow_list = allow_list;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }
}

/// Shared by the auth gate and the user handlers.
#[derive(Clone, Debug)]
pub struct AuthState {
    config: AuthConfig,
    sessions: Sessions,
    credentials: Arc<Credentials>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        repository: Arc<dyn SessionRepository>,
        credentials: Credentials,
    ) -> Self {
        let sessions = Sessions::new(repository, config.session_ttl_seconds());
        Self {
            config,
            sessions,
            credentials: Arc::new(credentials),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    #[must_use]
    pub fn allow_list(&self) -> &AllowList {
        self.config.allow_list()
    }
}
