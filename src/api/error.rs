//! Error type rendered by every handler and by the auth gate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use super::handlers::{
    auth::SessionError,
    patch::{NoOpError, PatchError},
};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, unknown or expired session. Deliberately one message for all three.
    #[error("no auth")]
    Unauthenticated,
    #[error("nothing to update")]
    NoOp,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// Details are logged where the failure happens, never sent to the client.
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NoOp | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.to_string(),
            }
        }));
        (self.status(), body).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound => Self::Unauthenticated,
            SessionError::Storage(err) => {
                error!("Session storage failure: {err:#}");
                Self::Internal
            }
        }
    }
}

impl From<NoOpError> for ApiError {
    fn from(_: NoOpError) -> Self {
        Self::NoOp
    }
}

impl From<PatchError> for ApiError {
    fn from(err: PatchError) -> Self {
        match err {
            PatchError::NoOp(_) => Self::NoOp,
            PatchError::Conflict => Self::Conflict(err.to_string()),
            PatchError::Storage(err) => err.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("Request failed: {err:#}");
        Self::Internal
    }
}
