//! Password hashing with a per-digest random salt.
//!
//! Digests are PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), so the
//! salt travels with the digest and verification recovers it from there.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
const DEFAULT_ITERATIONS: u32 = 1;
const DEFAULT_PARALLELISM: u32 = 4;
const OUTPUT_LEN: usize = 32;

/// Argon2id hasher plus a throwaway digest used to equalize login timing.
pub struct Credentials {
    argon2: Argon2<'static>,
    dummy_digest: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

impl Credentials {
    /// Build a hasher with the production cost parameters.
    ///
    /// # Errors
    /// Returns an error if the dummy digest cannot be computed.
    pub fn new() -> Result<Self> {
        Self::with_params(DEFAULT_MEMORY_KIB, DEFAULT_ITERATIONS, DEFAULT_PARALLELISM)
    }

    /// Build a hasher with explicit Argon2id cost parameters.
    ///
    /// # Errors
    /// Returns an error for invalid parameters.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, Some(OUTPUT_LEN))
            .map_err(|err| anyhow!("invalid argon2 parameters: {err}"))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut credentials = Self {
            argon2,
            dummy_digest: String::new(),
        };
        let dummy_password = super::utils::generate_session_token()?;
        credentials.dummy_digest = credentials.hash(&dummy_password)?;
        Ok(credentials)
    }

    /// Hash a password with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| anyhow!("failed to hash password: {err}"))?;
        Ok(digest.to_string())
    }

    /// Check a password against a stored digest.
    ///
    /// The comparison is constant time. A mismatch, or a digest that cannot be
    /// parsed, is reported as `false`.
    #[must_use]
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(err) => {
                error!("Stored password digest is malformed: {err}");
                return false;
            }
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Spend the same work as [`Credentials::verify`] when there is no user to check.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_digest);
    }
}
