//! Record store seam for author imports.
//!
//! The import pipeline only needs one operation from persistence: insert a
//! batch of author names. `AuthorStore` captures that contract so the worker
//! pool can run against Postgres in production and an in-memory recorder in
//! tests.

pub mod postgres;

use crate::models::Author;
use async_trait::async_trait;
use thiserror::Error;

pub use postgres::PgAuthorStore;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Errors surfaced by an [`AuthorStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("author name already exists: {0}")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("batch rejected by store: {0}")]
    Rejected(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let conflict = match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Some(db_err.message().to_string())
            }
            _ => None,
        };

        match conflict {
            Some(message) => StoreError::UniqueViolation(message),
            None => StoreError::Database(err),
        }
    }
}

/// Persistence contract used by import workers.
///
/// Implementations must tolerate concurrent calls with disjoint batches.
/// `batch_size` is a hint for how many rows to send per statement.
#[async_trait]
pub trait AuthorStore: Send + Sync {
    async fn insert_batch(&self, authors: &[Author], batch_size: usize) -> Result<(), StoreError>;
}
