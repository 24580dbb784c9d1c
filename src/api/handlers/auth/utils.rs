//! Small helpers for session token handling.

use anyhow::{Context, Result};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Scheme prefixes accepted in front of the token, compared case-insensitively.
const TOKEN_SCHEMES: [&str; 2] = ["token", "bearer"];

/// Create a new session token.
///
/// 32 bytes from the OS RNG, base64url without padding. The raw value is only
/// handed to the client; the database stores a hash.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a session token so raw values never touch the database.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Read the session token from the `Authorization` header.
///
/// Accepts a bare token or one prefixed with `Token ` / `Bearer `.
/// Returns `None` for a missing, non-ASCII or empty value.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = strip_scheme(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn strip_scheme(value: &str) -> &str {
    let is_scheme = |candidate: &str| {
        TOKEN_SCHEMES
            .iter()
            .any(|known| candidate.eq_ignore_ascii_case(known))
    };
    match value.split_once(' ') {
        Some((scheme, rest)) if is_scheme(scheme) => rest,
        // A scheme with nothing after it carries no token.
        None if is_scheme(value) => "",
        _ => value,
    }
}
