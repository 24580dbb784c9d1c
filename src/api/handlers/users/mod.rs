//! Registration, login/logout and profile endpoints.
//!
//! Flow Overview:
//! 1) `POST /api/users` registers an account (public).
//! 2) `POST /api/users/login` checks the password and issues a session token,
//!    returned in the `Authorization` response header (public).
//! 3) Everything under `/api/user` runs behind the auth gate and acts on the
//!    caller's own account only.
//!
//! Unknown email and wrong password produce the same 401 and cost the same
//! argon2 work. Password hashing runs on the blocking pool.

mod storage;
pub(crate) mod types;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use super::{
    auth::{AuthContext, AuthState},
    normalize_email, valid_email,
};
use crate::api::error::ApiError;
use crate::api::handlers::patch::PatchError;

pub use storage::{InsertOutcome, PgUserStore, UserStore};
pub use types::{
    LoginRequest, NewUser, RegisterRequest, UpdateUserRequest, UserBody, UserPatch, UserRecord,
    UserResponse,
};

/// Header asking logout to revoke every session of the caller.
pub const DELETE_ALL_HEADER: &str = "DeleteAll";

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered.", body = UserResponse),
        (status = 400, description = "Missing or invalid fields."),
        (status = 409, description = "Email or username already taken."),
    ),
    tag = "users"
)]
/// Registers a new account. The password is stored as an argon2id PHC string.
pub async fn register(
    Extension(users): Extension<Arc<dyn UserStore>>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = request.user;

    let email = normalize_email(&payload.email);
    if email.is_empty() {
        return Err(ApiError::BadRequest("email must not be empty".to_string()));
    }
    if !valid_email(&email) {
        return Err(ApiError::BadRequest("invalid email".to_string()));
    }
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::BadRequest(
            "username must not be empty".to_string(),
        ));
    }
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "password must not be empty".to_string(),
        ));
    }

    if users.email_taken(&email).await? {
        return Err(ApiError::Conflict(
            "user with this email already exists".to_string(),
        ));
    }
    if users.username_taken(&username).await? {
        return Err(ApiError::Conflict(
            "user with this username already exists".to_string(),
        ));
    }

    let password_digest = hash_password(&auth_state, payload.password).await?;
    let new_user = NewUser {
        email,
        username,
        password_digest,
    };

    match users.create(&new_user).await? {
        InsertOutcome::Created(record) => {
            debug!("registered user {}", record.id);
            Ok((StatusCode::CREATED, Json(UserResponse::from(record))))
        }
        InsertOutcome::Conflict => Err(ApiError::Conflict(
            "email or username already taken".to_string(),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; the session token is in the Authorization header.", body = UserResponse),
        (status = 400, description = "Missing email or password."),
        (status = 401, description = "Invalid email or password."),
    ),
    tag = "users"
)]
/// Verifies credentials and issues a new session token.
pub async fn login(
    Extension(users): Extension<Arc<dyn UserStore>>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = request.user;
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "email or password must not be empty".to_string(),
        ));
    }

    let (user, digest) = users.find_credentials(&email).await?.unzip();

    let verified = verify_password(&auth_state, payload.password, digest).await?;
    let Some(user) = user.filter(|_| verified) else {
        return Err(ApiError::Unauthenticated);
    };

    let token = auth_state.sessions().create(user.id).await?;
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&token).context("session token is not a valid header value")?,
    );

    Ok((headers, Json(UserResponse::from(user))))
}

#[utoipa::path(
    post,
    path = "/api/user/logout",
    params(
        ("DeleteAll" = Option<String>, Header, description = "`true` revokes every session of the user"),
    ),
    responses(
        (status = 204, description = "Session(s) revoked."),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "users"
)]
/// Revokes the presented token, or all of the caller's tokens with `DeleteAll: true`.
pub async fn logout(
    context: AuthContext,
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    if wants_delete_all(&headers) {
        auth_state.sessions().revoke_all(context.user_id).await?;
    } else {
        auth_state.sessions().revoke(&context.token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "Current user.", body = UserResponse),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "User no longer exists."),
    ),
    tag = "users"
)]
pub async fn current_user(
    context: AuthContext,
    Extension(users): Extension<Arc<dyn UserStore>>,
) -> Result<impl IntoResponse, ApiError> {
    let user = users
        .find_by_id(context.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/user",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user.", body = UserResponse),
        (status = 400, description = "Nothing to update or invalid fields."),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "User no longer exists."),
        (status = 409, description = "Email or username already taken."),
    ),
    tag = "users"
)]
/// Partially updates the caller's profile; absent fields are left untouched.
/// A new password must differ from the current one.
pub async fn update_user(
    context: AuthContext,
    Extension(users): Extension<Arc<dyn UserStore>>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = request.user;
    let current = users
        .find_by_id(context.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    let mut patch = UserPatch {
        bio: payload.bio,
        image: payload.image,
        ..UserPatch::default()
    };

    if let Some(email) = payload.email {
        let email = normalize_email(&email);
        if !valid_email(&email) {
            return Err(ApiError::BadRequest("invalid email".to_string()));
        }
        if email != current.email && users.email_taken(&email).await? {
            return Err(ApiError::Conflict(
                "user with this email already exists".to_string(),
            ));
        }
        patch.email = Some(email);
    }

    if let Some(username) = payload.username {
        let username = username.trim().to_string();
        if username.is_empty() {
            return Err(ApiError::BadRequest(
                "username must not be empty".to_string(),
            ));
        }
        if username != current.username && users.username_taken(&username).await? {
            return Err(ApiError::Conflict(
                "user with this username already exists".to_string(),
            ));
        }
        patch.username = Some(username);
    }

    if let Some(password) = payload.password {
        if password.is_empty() {
            return Err(ApiError::BadRequest(
                "password must not be empty".to_string(),
            ));
        }
        let digest = users.password_digest(context.user_id).await?;
        if verify_password(&auth_state, password.clone(), digest).await? {
            return Err(ApiError::BadRequest(
                "new password must differ from the current one".to_string(),
            ));
        }
        patch.password_digest = Some(hash_password(&auth_state, password).await?);
    }

    match users.partial_update(&patch, context.user_id).await {
        Ok(_) => {}
        Err(PatchError::Conflict) => {
            return Err(ApiError::Conflict(
                "email or username already taken".to_string(),
            ))
        }
        Err(err) => return Err(err.into()),
    }

    let user = users
        .find_by_id(context.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    delete,
    path = "/api/user",
    responses(
        (status = 204, description = "Account deleted along with its sessions and articles."),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "User no longer exists."),
    ),
    tag = "users"
)]
pub async fn delete_user(
    context: AuthContext,
    Extension(users): Extension<Arc<dyn UserStore>>,
) -> Result<impl IntoResponse, ApiError> {
    if !users.delete(context.user_id).await? {
        return Err(ApiError::NotFound("user not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn wants_delete_all(headers: &HeaderMap) -> bool {
    headers
        .get(DELETE_ALL_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

async fn hash_password(auth_state: &Arc<AuthState>, password: String) -> Result<String> {
    let auth_state = Arc::clone(auth_state);
    tokio::task::spawn_blocking(move || auth_state.credentials().hash(&password))
        .await
        .context("password hashing task failed")?
}

/// Verify `password` against `digest`, or burn an equivalent dummy verification
/// when there is no digest to check.
async fn verify_password(
    auth_state: &Arc<AuthState>,
    password: String,
    digest: Option<String>,
) -> Result<bool> {
    let auth_state = Arc::clone(auth_state);
    tokio::task::spawn_blocking(move || match digest {
        Some(digest) => auth_state.credentials().verify(&password, &digest),
        None => {
            auth_state.credentials().verify_dummy(&password);
            false
        }
    })
    .await
    .context("password verification task failed")
}
