pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod store;

use env_logger::Env;
use std::sync::Once;

pub use config::{DatabaseConfig, ImportConfig};
pub use error::ImportError;
pub use import::{AuthorImporter, ImportReport, ImportStats};
pub use models::Author;
pub use store::{AuthorStore, PgAuthorStore, StoreError};

static LOGGER: Once = Once::new();

/// Install the global logger once. `RUST_LOG` overrides the default filter.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info,sqlx=warn")).init();
    });
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use crate::models::Author;
    use crate::store::{AuthorStore, StoreError};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    pub use database::{TestDatabase, TestDatabaseError};

    /// In-memory [`AuthorStore`] that records every batch it is handed.
    ///
    /// Enforces name uniqueness like the real table, and can be told to fail
    /// any batch containing a given name or to sleep before each insert.
    #[derive(Default)]
    pub struct RecordingStore {
        submitted: Mutex<Vec<Vec<Author>>>,
        stored: Mutex<HashSet<String>>,
        fail_on: HashSet<String>,
        delay: Option<Duration>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl RecordingStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reject every batch that contains `name`.
        pub fn failing_on(mut self, name: &str) -> Self {
            self.fail_on.insert(name.to_string());
            self
        }

        /// Sleep for `delay` inside every insert call.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Names already present before the import, as if left by an earlier run.
        pub fn with_existing(self, names: &[&str]) -> Self {
            if let Ok(mut stored) = self.stored.lock() {
                stored.extend(names.iter().map(|name| name.to_string()));
            }
            self
        }

        /// Every batch passed to `insert_batch`, in call order.
        pub fn submitted(&self) -> Vec<Vec<Author>> {
            self.submitted.lock().expect("submitted lock").clone()
        }

        /// All names passed to `insert_batch`, duplicates included.
        pub fn submitted_names(&self) -> Vec<String> {
            self.submitted()
                .into_iter()
                .flatten()
                .map(|author| author.name)
                .collect()
        }

        pub fn stored_count(&self) -> usize {
            self.stored.lock().expect("stored lock").len()
        }

        pub fn calls(&self) -> usize {
            self.submitted.lock().expect("submitted lock").len()
        }

        /// Highest number of concurrent `insert_batch` calls observed.
        pub fn peak_concurrency(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }

        fn commit(&self, authors: &[Author]) -> Result<(), StoreError> {
            if let Some(author) = authors.iter().find(|a| self.fail_on.contains(&a.name)) {
                return Err(StoreError::Rejected(format!(
                    "refusing batch containing {}",
                    author.name
                )));
            }

            let mut stored = self.stored.lock().expect("stored lock");
            if let Some(author) = authors.iter().find(|a| stored.contains(&a.name)) {
                return Err(StoreError::UniqueViolation(format!(
                    "duplicate key value violates unique constraint \"idx_authors_name\": {}",
                    author.name
                )));
            }
            stored.extend(authors.iter().map(|author| author.name.clone()));
            Ok(())
        }
    }

    #[async_trait]
    impl AuthorStore for RecordingStore {
        async fn insert_batch(
            &self,
            authors: &[Author],
            _batch_size: usize,
        ) -> Result<(), StoreError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

            self.submitted
                .lock()
                .expect("submitted lock")
                .push(authors.to_vec());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let result = self.commit(authors);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    pub mod database {
        use crate::db;
        use log::LevelFilter;
        use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use sqlx::{ConnectOptions, PgPool};
        use testcontainers::{ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner};
        use testcontainers_modules::postgres::Postgres;
        use thiserror::Error;
        use uuid::Uuid;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            /// Provision a fresh, migrated database in a disposable Postgres container.
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let container = Postgres::default().start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                let admin_options: PgConnectOptions = admin_url.parse()?;
                let admin_options = admin_options.log_statements(LevelFilter::Off);

                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await?;

                let database_name = format!("authors_{}", Uuid::new_v4().simple());
                let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", database_name);
                sqlx::query(&create_sql).execute(&admin_pool).await?;
                admin_pool.close().await;

                let pool = PgPoolOptions::new()
                    .max_connections(8)
                    .connect_with(admin_options.database(&database_name))
                    .await?;

                db::run_migrations(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    container: Some(container),
                })
            }

            /// Cloneable connection pool for use in tests.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Close pool connections and stop the container.
            pub async fn close(mut self) {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }
                self.container.take();
            }
        }
    }
}
