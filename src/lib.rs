//! # Folio (Users and Articles API)
//!
//! `folio` is a REST backend for users and the articles they publish.
//!
//! ## Sessions
//!
//! Logging in issues an opaque bearer token; the database only keeps its
//! SHA-256. Every request goes through a gate that resolves the token from
//! the `Authorization` header, unless the route and method are on the public
//! allow list. Sessions expire after a configurable TTL and can be revoked
//! one at a time or all at once.
//!
//! ## Partial updates
//!
//! `PUT` handlers accept sparse bodies. Only the fields present are written,
//! through a single parameterized `UPDATE` built by
//! [`api::handlers::patch::build`]; an empty body is rejected before touching
//! the database.
//!
//! ## Ownership
//!
//! Articles can only be changed by their author. A request for someone
//! else's article answers `404 Not Found`, the same as a missing one.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
