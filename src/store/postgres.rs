//! Postgres-backed author store.
//!
//! Uses UNNEST for multi-row inserts. There is deliberately no `ON CONFLICT`
//! clause: the unique index on `authors.name` is the backstop for names
//! already stored by a previous run, and a conflict fails the whole batch.

use crate::models::{Author, StoredAuthor};
use crate::store::{AuthorStore, StoreError};
use async_trait::async_trait;
use sqlx::PgPool;

#[derive(Clone)]
pub struct PgAuthorStore {
    pool: PgPool,
}

impl PgAuthorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Count all stored authors.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM authors")
            .fetch_one(&self.pool)
            .await
    }

    /// Load stored authors ordered by id.
    pub async fn list(&self) -> Result<Vec<StoredAuthor>, sqlx::Error> {
        sqlx::query_as::<_, StoredAuthor>("SELECT id, name FROM authors ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }
}

#[async_trait]
impl AuthorStore for PgAuthorStore {
    /// Insert a batch of authors in one transaction.
    ///
    /// The batch is sent in statements of at most `batch_size` rows. Either
    /// every row of the batch is committed or none is.
    async fn insert_batch(&self, authors: &[Author], batch_size: usize) -> Result<(), StoreError> {
        if authors.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for chunk in authors.chunks(batch_size.max(1)) {
            let names: Vec<String> = chunk.iter().map(|author| author.name.clone()).collect();

            sqlx::query(
                r#"INSERT INTO authors (name)
                   SELECT name FROM UNNEST($1::text[]) AS t(name)"#,
            )
            .bind(&names)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        log::trace!("bulk inserted {} authors", authors.len());
        Ok(())
    }
}
