//! Request gate: every request passes here before reaching a handler.
//!
//! Flow Overview: allow-listed `(route, method)` pairs pass straight through;
//! everything else must carry a session token in `Authorization`, which is
//! resolved on every request. On success an [`AuthContext`] is attached to the
//! request extensions. Unknown and expired tokens are indistinguishable to the
//! client; storage failures are logged and answered with 500.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use super::{context::AuthContext, session::SessionError, utils::extract_session_token, AuthState};
use crate::api::error::ApiError;

pub async fn require_session(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if auth_state
        .allow_list()
        .is_exempt(request.uri().path(), request.method())
    {
        return next.run(request).await;
    }

    let Some(token) = extract_session_token(request.headers()) else {
        return ApiError::Unauthenticated.into_response();
    };

    match auth_state.sessions().lookup(&token).await {
        Ok(session) => {
            request.extensions_mut().insert(AuthContext {
                user_id: session.user_id,
                token: session.token,
            });
            next.run(request).await
        }
        Err(SessionError::NotFound) => ApiError::Unauthenticated.into_response(),
        Err(SessionError::Storage(err)) => {
            error!(
                path = request.uri().path(),
                method = %request.method(),
                "Failed to lookup session: {err:#}"
            );
            ApiError::Internal.into_response()
        }
    }
}
