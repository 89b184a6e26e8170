//! SQLite-backed contractor record store.
//!
//! Provides the connection pool, embedded migrations, row models, and
//! the [`repositories::ContractorRepo`] that implements the duplicate
//! merge/cleanup engine over stored rows. Job state is deliberately not
//! persisted; jobs are process-lifetime only.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub mod error;
pub mod models;
pub mod repositories;

pub use error::StoreError;

/// Shared SQLite connection pool.
pub type DbPool = sqlx::SqlitePool;

/// Create a connection pool for `database_url` (e.g.
/// `sqlite://contractors.db`), creating the database file if missing.
///
/// In-memory databases are pinned to a single connection so every query
/// sees the same database.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// Apply embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Fresh in-memory database with migrations applied. Test helper used
/// across the workspace.
pub async fn memory_pool() -> Result<DbPool, StoreError> {
    let pool = create_pool("sqlite::memory:").await?;
    run_migrations(&pool).await.map_err(sqlx::Error::from)?;
    Ok(pool)
}
