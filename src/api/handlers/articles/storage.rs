//! Article persistence.
//!
//! Every write is scoped to the owning user: an update or delete aimed at
//! someone else's article matches zero rows and reports nothing changed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;

use super::super::patch::{self, KeyPredicate, NoOpError, PatchError, UpdateStatement};
use super::types::{ArticleFilter, ArticlePatch, ArticleRecord, AuthorRecord, NewArticle};

const ARTICLE_SELECT: &str = r#"SELECT a.id, a.user_id, u.username, u.image,
    a.title, a.slug, a.description, a.body, a.tag_list,
    to_char(a.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
    to_char(a.updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
    FROM articles a
    JOIN users u ON u.id = a.user_id"#;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert and return the new id.
    async fn create(&self, article: &NewArticle) -> Result<i64>;

    /// Newest first.
    async fn list(&self, filter: &ArticleFilter) -> Result<Vec<ArticleRecord>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ArticleRecord>>;

    /// Apply `patch` to article `id` if owned by `owner`; returns rows touched.
    async fn partial_update(
        &self,
        patch: &ArticlePatch,
        id: i64,
        owner: i64,
    ) -> Result<u64, PatchError>;

    /// Returns `false` if nothing matched `(id, owner)`.
    async fn delete(&self, id: i64, owner: i64) -> Result<bool>;
}

const DELETE_OWNED: &str = "DELETE FROM articles WHERE id = $1 AND user_id = $2";

/// Update of article `id` that only matches while `owner` still owns it.
fn owned_update(
    patch: &ArticlePatch,
    id: i64,
    owner: i64,
) -> Result<UpdateStatement, NoOpError> {
    patch::build(patch, &KeyPredicate::new("id", id).and("user_id", owner))
}

#[derive(Clone, Debug)]
pub struct PgArticleStore {
    pool: PgPool,
}

impl PgArticleStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn article_from_row(row: &PgRow) -> ArticleRecord {
    ArticleRecord {
        id: row.get("id"),
        author: AuthorRecord {
            id: row.get("user_id"),
            username: row.get("username"),
            image: row.get("image"),
        },
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        body: row.get("body"),
        tag_list: row.get("tag_list"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn create(&self, article: &NewArticle) -> Result<i64> {
        let query = r"
            INSERT INTO articles (user_id, title, slug, description, body, tag_list)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query_scalar::<_, i64>(query)
            .bind(article.user_id)
            .bind(&article.title)
            .bind(&article.slug)
            .bind(article.description.as_deref())
            .bind(article.body.as_deref())
            .bind(&article.tag_list)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert article")
    }

    async fn list(&self, filter: &ArticleFilter) -> Result<Vec<ArticleRecord>> {
        let (condition, value) = match filter {
            ArticleFilter::All => ("", None),
            ArticleFilter::Author(username) => (" WHERE u.username = $1", Some(username)),
            ArticleFilter::Tag(tag) => (" WHERE $1 = ANY(a.tag_list)", Some(tag)),
        };
        let query = format!("{ARTICLE_SELECT}{condition} ORDER BY a.created_at DESC, a.id DESC");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );

        let mut statement = sqlx::query(&query);
        if let Some(value) = value {
            statement = statement.bind(value);
        }
        let rows = statement
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to list articles")?;

        Ok(rows.iter().map(article_from_row).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ArticleRecord>> {
        let query = format!("{ARTICLE_SELECT} WHERE a.id = $1 LIMIT 1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup article")?;

        Ok(row.as_ref().map(article_from_row))
    }

    async fn partial_update(
        &self,
        patch: &ArticlePatch,
        id: i64,
        owner: i64,
    ) -> Result<u64, PatchError> {
        owned_update(patch, id, owner)?
            .execute(&self.pool)
            .await
    }

    async fn delete(&self, id: i64, owner: i64) -> Result<bool> {
        let query = DELETE_OWNED;
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete article")?;
        Ok(result.rows_affected() > 0)
    }
}
