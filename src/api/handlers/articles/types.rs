//! Request/response types for the articles API and the records exchanged with
//! the store.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::super::patch::{Patch, SqlValue};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorRecord {
    pub id: i64,
    pub username: String,
    pub image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArticleRecord {
    pub id: i64,
    pub author: AuthorRecord,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub body: Option<String>,
    pub tag_list: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewArticle {
    pub user_id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub body: Option<String>,
    pub tag_list: Vec<String>,
}

/// Which articles a listing returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArticleFilter {
    All,
    Author(String),
    Tag(String),
}

/// Sparse update of an article row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArticlePatch {
    pub body: Option<String>,
    pub description: Option<String>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub tag_list: Option<Vec<String>>,
}

impl Patch for ArticlePatch {
    const TABLE: &'static str = "articles";

    fn fields(&self) -> Vec<(&'static str, Option<SqlValue>)> {
        vec![
            ("body", self.body.clone().map(SqlValue::from)),
            ("description", self.description.clone().map(SqlValue::from)),
            ("title", self.title.clone().map(SqlValue::from)),
            ("slug", self.slug.clone().map(SqlValue::from)),
            ("tag_list", self.tag_list.clone().map(SqlValue::from)),
        ]
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticle {
    pub title: String,
    pub description: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub tag_list: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateArticleRequest {
    pub article: CreateArticle,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub tag_list: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateArticleRequest {
    pub article: UpdateArticle,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListArticlesQuery {
    /// Only articles written by this username.
    pub author: Option<String>,
    /// Only articles carrying this tag. Ignored when `author` is given.
    pub tag: Option<String>,
}

impl ListArticlesQuery {
    #[must_use]
    pub fn filter(&self) -> ArticleFilter {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToString::to_string)
        };
        if let Some(author) = non_empty(&self.author) {
            ArticleFilter::Author(author)
        } else if let Some(tag) = non_empty(&self.tag) {
            ArticleFilter::Tag(tag)
        } else {
            ArticleFilter::All
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorBody {
    pub id: i64,
    pub username: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticleBody {
    pub id: i64,
    pub author: AuthorBody,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub body: Option<String>,
    pub tag_list: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ArticleRecord> for ArticleBody {
    fn from(record: ArticleRecord) -> Self {
        Self {
            id: record.id,
            author: AuthorBody {
                id: record.author.id,
                username: record.author.username,
                image: record.author.image,
            },
            title: record.title,
            slug: record.slug,
            description: record.description,
            body: record.body,
            tag_list: record.tag_list,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ArticleResponse {
    pub article: ArticleBody,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticlesResponse {
    pub articles: Vec<ArticleBody>,
    pub articles_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedArticle {
    pub id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedArticleResponse {
    pub article: CreatedArticle,
}
