use axum::http::{Method, StatusCode};

use super::handlers::test_support::{request, test_router, MemoryStore};

#[tokio::test]
async fn root_reports_user_agent() {
    let store = MemoryStore::new();
    let router = test_router(&store);

    let response = request(Method::GET, "/").send(&router).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.as_str(), Some(crate::APP_USER_AGENT));
}

#[tokio::test]
async fn health_reports_build_and_database() {
    let store = MemoryStore::new();
    let router = test_router(&store);

    let response = request(Method::GET, "/health").send(&router).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(response.body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(response.body["database"], "ok");
    let x_app = response
        .headers
        .get("x-app")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(x_app.starts_with(&format!(
        "{}:{}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )));
}

#[tokio::test]
async fn health_is_unavailable_without_database() {
    let store = MemoryStore::new();
    let router = test_router(&store);
    store.set_offline(true);

    let response = request(Method::GET, "/health").send(&router).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["database"], "error");
}

#[tokio::test]
async fn openapi_document_is_public() {
    let store = MemoryStore::new();
    let router = test_router(&store);

    let response = request(Method::GET, "/openapi.json").send(&router).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["info"]["title"], env!("CARGO_PKG_NAME"));
    assert!(response.body["paths"]["/api/articles/{id}"].is_object());
}
