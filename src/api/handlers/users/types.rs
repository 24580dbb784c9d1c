//! Request/response types for the users API, plus the row-level records the
//! store exchanges with handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::patch::{Patch, SqlValue};

/// A user as stored, without the password digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_digest: String,
}

/// Sparse update of a user row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password_digest: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl Patch for UserPatch {
    const TABLE: &'static str = "users";

    fn fields(&self) -> Vec<(&'static str, Option<SqlValue>)> {
        vec![
            ("email", self.email.clone().map(SqlValue::from)),
            (
                "password_digest",
                self.password_digest.clone().map(SqlValue::from),
            ),
            ("username", self.username.clone().map(SqlValue::from)),
            ("bio", self.bio.clone().map(SqlValue::from)),
            ("image", self.image.clone().map(SqlValue::from)),
        ]
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterUser {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub user: RegisterUser,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginUser {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub user: LoginUser,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub user: UpdateUser,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserBody {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub user: UserBody,
}

impl From<UserRecord> for UserResponse {
    fn from(record: UserRecord) -> Self {
        Self {
            user: UserBody {
                id: record.id,
                email: record.email,
                username: record.username,
                bio: record.bio,
                image: record.image,
                created_at: record.created_at,
                updated_at: record.updated_at,
            },
        }
    }
}
