//! Partial-update statements built from sparse patch records.
//!
//! A [`Patch`] lists its columns in a fixed order, each either absent (`None`)
//! or present. [`build`] turns the present ones into `column = $n` clauses,
//! always appends `updated_at = NOW()`, and closes with a key predicate that
//! pins the row by id and owner. Statement text only ever contains static
//! column names and placeholders; values travel as bound arguments.
//!
//! A patch with nothing present is rejected with [`NoOpError`]. A statement
//! that matches zero rows is not an error: a missing row and a row owned by
//! someone else look the same to the caller.

use anyhow::anyhow;
use sqlx::{
    postgres::{PgArguments, PgPool},
    query::Query,
    Postgres,
};
use std::fmt::Write as _;
use thiserror::Error;
use tracing::Instrument;

use super::is_unique_violation;

/// A value bound to a placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    BigInt(i64),
    TextArray(Vec<String>),
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::BigInt(value)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(value: Vec<String>) -> Self {
        Self::TextArray(value)
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("nothing to update")]
pub struct NoOpError;

/// Failure of a store's `partial_update`.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error(transparent)]
    NoOp(#[from] NoOpError),
    /// A unique column would collide with another row.
    #[error("update conflicts with an existing row")]
    Conflict,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// A sparse update record.
pub trait Patch {
    /// Table the patch applies to.
    const TABLE: &'static str;

    /// Every updatable column in declared order; `None` marks an absent field.
    fn fields(&self) -> Vec<(&'static str, Option<SqlValue>)>;
}

/// Columns that identify the row, joined with `AND`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPredicate {
    columns: Vec<(&'static str, SqlValue)>,
}

impl KeyPredicate {
    #[must_use]
    pub fn new(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self {
            columns: vec![(column, value.into())],
        }
    }

    #[must_use]
    pub fn and(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.columns.push((column, value.into()));
        self
    }
}

/// A ready-to-run parameterized `UPDATE`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateStatement {
    table: &'static str,
    sql: String,
    args: Vec<SqlValue>,
    assignments: usize,
}

impl UpdateStatement {
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound values, in placeholder order.
    #[must_use]
    pub fn args(&self) -> &[SqlValue] {
        &self.args
    }

    /// Number of patched columns, not counting `updated_at`.
    #[must_use]
    pub fn assignments(&self) -> usize {
        self.assignments
    }

    /// Bind every argument onto a sqlx query.
    #[must_use]
    pub fn query(&self) -> Query<'_, Postgres, PgArguments> {
        self.args
            .iter()
            .fold(sqlx::query(&self.sql), |query, arg| match arg {
                SqlValue::Text(value) => query.bind(value.clone()),
                SqlValue::BigInt(value) => query.bind(*value),
                SqlValue::TextArray(value) => query.bind(value.clone()),
            })
    }

    /// Execute against the pool, returning the number of rows touched.
    ///
    /// # Errors
    /// [`PatchError::Conflict`] on a unique violation, [`PatchError::Storage`]
    /// for any other database failure.
    pub async fn execute(&self, pool: &PgPool) -> Result<u64, PatchError> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = self.sql.as_str()
        );
        match self.query().execute(pool).instrument(span).await {
            Ok(result) => Ok(result.rows_affected()),
            Err(err) if is_unique_violation(&err) => Err(PatchError::Conflict),
            Err(err) => Err(anyhow!(err)
                .context(format!("failed to apply partial update to {}", self.table))
                .into()),
        }
    }
}

/// Build the `UPDATE` for `patch`, restricted to the row matched by `key`.
///
/// # Errors
/// Returns [`NoOpError`] when no field of the patch is present.
pub fn build<P: Patch>(patch: &P, key: &KeyPredicate) -> Result<UpdateStatement, NoOpError> {
    let mut sql = format!("UPDATE {} SET ", P::TABLE);
    let mut args = Vec::new();

    for (column, value) in patch.fields() {
        let Some(value) = value else {
            continue;
        };
        args.push(value);
        // Writing into a String cannot fail.
        let _ = write!(sql, "{column} = ${}, ", args.len());
    }

    let assignments = args.len();
    if assignments == 0 {
        return Err(NoOpError);
    }

    sql.push_str("updated_at = NOW() WHERE ");
    for (index, (column, value)) in key.columns.iter().enumerate() {
        if index > 0 {
            sql.push_str(" AND ");
        }
        args.push(value.clone());
        let _ = write!(sql, "{column} = ${}", args.len());
    }

    Ok(UpdateStatement {
        table: P::TABLE,
        sql,
        args,
        assignments,
    })
}
