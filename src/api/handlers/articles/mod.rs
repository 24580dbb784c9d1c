//! Article endpoints.
//!
//! Reads are public (`GET /api/articles` and, through allow-list
//! normalization, `GET /api/articles/{id}`). Writes require a session and are
//! scoped to the caller: updating or deleting another user's article answers
//! 404, exactly like a missing one.

mod slug;
mod storage;
pub(crate) mod types;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use super::auth::AuthContext;
use crate::api::error::ApiError;
use slug::slugify;

pub use storage::{ArticleStore, PgArticleStore};
pub use types::{
    ArticleBody, ArticleFilter, ArticlePatch, ArticleRecord, ArticleResponse, ArticlesResponse,
    AuthorRecord, CreateArticleRequest, CreatedArticleResponse, ListArticlesQuery, NewArticle,
    UpdateArticleRequest,
};

fn not_found() -> ApiError {
    ApiError::NotFound("article not found".to_string())
}

#[utoipa::path(
    post,
    path = "/api/articles",
    request_body = CreateArticleRequest,
    responses(
        (status = 201, description = "Article created.", body = CreatedArticleResponse),
        (status = 400, description = "Missing title."),
        (status = 401, description = "Missing or invalid session."),
    ),
    tag = "articles"
)]
/// Creates an article owned by the caller. The slug is derived from the title.
pub async fn create_article(
    context: AuthContext,
    Extension(articles): Extension<Arc<dyn ArticleStore>>,
    Json(request): Json<CreateArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = request.article;
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }

    let new_article = NewArticle {
        user_id: context.user_id,
        slug: slugify(&title),
        title,
        description: payload.description,
        body: payload.body,
        tag_list: payload.tag_list,
    };
    let id = articles.create(&new_article).await?;
    debug!("user {} created article {id}", context.user_id);

    Ok((
        StatusCode::CREATED,
        Json(CreatedArticleResponse {
            article: types::CreatedArticle { id },
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/articles",
    params(ListArticlesQuery),
    responses(
        (status = 200, description = "Articles, newest first.", body = ArticlesResponse),
    ),
    tag = "articles"
)]
pub async fn list_articles(
    Query(query): Query<ListArticlesQuery>,
    Extension(articles): Extension<Arc<dyn ArticleStore>>,
) -> Result<impl IntoResponse, ApiError> {
    let records = articles.list(&query.filter()).await?;
    let articles: Vec<ArticleBody> = records.into_iter().map(ArticleBody::from).collect();
    Ok(Json(ArticlesResponse {
        articles_count: articles.len(),
        articles,
    }))
}

#[utoipa::path(
    get,
    path = "/api/articles/{id}",
    params(("id" = i64, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article detail.", body = ArticleResponse),
        (status = 404, description = "Article not found."),
    ),
    tag = "articles"
)]
pub async fn get_article(
    Path(id): Path<i64>,
    Extension(articles): Extension<Arc<dyn ArticleStore>>,
) -> Result<impl IntoResponse, ApiError> {
    let record = articles.find_by_id(id).await?.ok_or_else(not_found)?;
    Ok(Json(ArticleResponse {
        article: record.into(),
    }))
}

#[utoipa::path(
    put,
    path = "/api/articles/{id}",
    params(("id" = i64, Path, description = "Article id")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated article.", body = ArticleResponse),
        (status = 400, description = "Nothing to update or empty title."),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "Article not found or not owned by the caller."),
    ),
    tag = "articles"
)]
/// Partially updates an article owned by the caller. A new title also
/// regenerates the slug.
pub async fn update_article(
    context: AuthContext,
    Path(id): Path<i64>,
    Extension(articles): Extension<Arc<dyn ArticleStore>>,
    Json(request): Json<UpdateArticleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = request.article;

    let title = match payload.title {
        Some(title) => {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(ApiError::BadRequest("title must not be empty".to_string()));
            }
            Some(title)
        }
        None => None,
    };

    let patch = ArticlePatch {
        body: payload.body,
        description: payload.description,
        slug: title.as_deref().map(slugify),
        title,
        tag_list: payload.tag_list,
    };

    let touched = articles
        .partial_update(&patch, id, context.user_id)
        .await?;
    if touched == 0 {
        return Err(not_found());
    }

    let record = articles.find_by_id(id).await?.ok_or_else(not_found)?;
    Ok(Json(ArticleResponse {
        article: record.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/articles/{id}",
    params(("id" = i64, Path, description = "Article id")),
    responses(
        (status = 204, description = "Article deleted."),
        (status = 401, description = "Missing or invalid session."),
        (status = 404, description = "Article not found or not owned by the caller."),
    ),
    tag = "articles"
)]
pub async fn delete_article(
    context: AuthContext,
    Path(id): Path<i64>,
    Extension(articles): Extension<Arc<dyn ArticleStore>>,
) -> Result<impl IntoResponse, ApiError> {
    if !articles.delete(id, context.user_id).await? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}
