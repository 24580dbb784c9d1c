use super::handlers::{articles, health, users};
use axum::Json;
use utoipa::{
    openapi::{Contact, InfoBuilder, License, Tag},
    OpenApi,
};

/// Routes documented here are served by `api::app`; keep both lists in sync.
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::register,
        users::login,
        users::logout,
        users::current_user,
        users::update_user,
        users::delete_user,
        articles::create_article,
        articles::list_articles,
        articles::get_article,
        articles::update_article,
        articles::delete_article,
    ),
    components(schemas(
        health::Health,
        users::types::RegisterRequest,
        users::types::RegisterUser,
        users::types::LoginRequest,
        users::types::LoginUser,
        users::types::UpdateUserRequest,
        users::types::UpdateUser,
        users::types::UserResponse,
        users::types::UserBody,
        articles::types::CreateArticleRequest,
        articles::types::CreateArticle,
        articles::types::UpdateArticleRequest,
        articles::types::UpdateArticle,
        articles::types::ArticleResponse,
        articles::types::ArticlesResponse,
        articles::types::ArticleBody,
        articles::types::AuthorBody,
        articles::types::CreatedArticleResponse,
        articles::types::CreatedArticle,
    ))
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    // Use Cargo.toml metadata instead of the derive defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.contact = cargo_contact();
    info.license = cargo_license();
    doc.info = info;

    let mut users_tag = Tag::new("users");
    users_tag.description = Some("Registration, sessions and profile".to_string());
    let mut articles_tag = Tag::new("articles");
    articles_tag.description = Some("Articles owned by users".to_string());
    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Liveness and build info".to_string());
    doc.tags = Some(vec![users_tag, articles_tag, health_tag]);

    doc
}

// axum handler for `/openapi.json`
pub async fn serve() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `:` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(':').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}
