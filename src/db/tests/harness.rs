//! Test harness for database repository testing
//!
//! Provides in-memory SQLite pools with real migrations applied.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::db::DbPool;

/// Create an in-memory SQLite pool for testing
pub async fn create_sqlite_pool() -> SqlitePool {
    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

/// Run SQLite migrations on the pool
///
/// Uses the actual migration files to ensure tests match production schema
pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations_sqlx/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}

/// Create a migrated [`DbPool`] backed by in-memory SQLite, ready for
/// service-level tests.
pub async fn create_db_pool() -> Arc<DbPool> {
    let pool = create_sqlite_pool().await;
    run_sqlite_migrations(&pool).await;
    Arc::new(DbPool::from_sqlite(pool))
}
