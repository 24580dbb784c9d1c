//! Session authentication.
//!
//! This module issues opaque bearer tokens at login, resolves them on every
//! request through the [`gate`], and revokes them at logout. Only the SHA-256
//! of a token is stored, so a leaked `sessions` table cannot be replayed.
//!
//! ## Public routes
//!
//! Routes that skip the gate are listed in an [`AllowList`] keyed by route
//! template. Entity paths such as `/api/articles/42` resolve to their
//! collection (`/api/articles`) before the lookup, one level deep only.
//!
//! ## Expiry
//!
//! Sessions older than the configured TTL are rejected and deleted by the
//! lookup that notices them. A TTL of zero keeps sessions until logout.

mod allow_list;
mod context;
pub mod gate;
pub(crate) mod password;
mod session;
mod state;
mod storage;
pub(crate) mod utils;

pub use allow_list::AllowList;
pub use context::AuthContext;
pub use password::Credentials;
pub use session::{Session, SessionError, SessionRecord, SessionRepository, Sessions};
pub use state::{AuthConfig, AuthState, DEFAULT_SESSION_TTL_SECONDS};
pub use storage::PgSessionRepository;
