//! Connection pool and schema management for the author store.

use crate::config::DatabaseConfig;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open a Postgres pool sized for the import workers.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    log::debug!(
        "connecting to database with up to {} connections",
        config.max_connections
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

/// Run database migrations.
///
/// This is idempotent - migrations that have already been applied will be skipped.
///
/// # Returns
/// `Ok(())` if migrations succeed, error otherwise
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    log::info!("checking database migration state");

    MIGRATOR.run(pool).await?;

    log::info!("database migrations up to date");
    Ok(())
}
