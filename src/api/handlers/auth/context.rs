//! Authenticated request context.
//!
//! The gate inserts an [`AuthContext`] into the request extensions after a
//! successful session lookup; handlers pull it back out as an extractor. A
//! handler reached without one (an allow-listed route) gets a 401.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::api::error::ApiError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}
