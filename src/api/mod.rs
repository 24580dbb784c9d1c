use crate::api::handlers::{
    articles::{self, ArticleStore, PgArticleStore},
    auth::{gate, AuthConfig, AuthState, Credentials, PgSessionRepository},
    health, root,
    users::{self, PgUserStore, UserStore},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod error;
pub mod handlers;
mod openapi;

pub use openapi::openapi;

/// Build the application router on top of the given stores.
///
/// Every route passes through the auth gate; public routes are the ones the
/// allow list in `auth_state` exempts.
#[must_use]
pub fn app(
    auth_state: Arc<AuthState>,
    users: Arc<dyn UserStore>,
    articles: Arc<dyn ArticleStore>,
) -> Router {
    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health))
        .route("/openapi.json", get(openapi::serve))
        .route("/api/users", post(users::register))
        .route("/api/users/login", post(users::login))
        .route("/api/user/logout", post(users::logout))
        .route(
            "/api/user",
            get(users::current_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/api/articles",
            get(articles::list_articles).post(articles::create_article),
        )
        .route(
            "/api/articles/:id",
            get(articles::get_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            gate::require_session,
        ))
        .layer(Extension(auth_state))
        .layer(Extension(users))
        .layer(Extension(articles))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, auth_config: AuthConfig) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    info!(
        "Auth gate exempts {} routes, session TTL {}s",
        auth_config.allow_list().len(),
        auth_config.session_ttl_seconds()
    );

    let auth_state = Arc::new(AuthState::new(
        auth_config,
        Arc::new(PgSessionRepository::new(pool.clone())),
        Credentials::new()?,
    ));
    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
    let articles: Arc<dyn ArticleStore> = Arc::new(PgArticleStore::new(pool));

    let app = app(auth_state, users, articles).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests;
