//! API handlers and shared utilities for Folio.
//!
//! Each resource lives in its own module with a capability trait for storage
//! and a Postgres implementation. `patch` holds the partial-update builder all
//! stores share.

pub mod articles;
pub mod auth;
pub mod health;
pub mod patch;
pub mod root;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

use regex::Regex;

/// Lightweight email sanity check used before persisting data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Emails are compared trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Postgres SQLSTATE 23505.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
