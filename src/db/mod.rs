mod error;
pub mod repos;
pub mod sqlite;

#[cfg(test)]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// Cached repository trait objects, created once at startup.
struct CachedRepos {
    billing: Arc<dyn BillingRepo>,
    resources: Arc<dyn ResourceRepo>,
}

/// Handle to the billing store.
///
/// Explicitly constructed and passed into every service rather than held in
/// module-level state, so tests can swap in fixture-backed pools.
/// Repositories are cached at construction time to avoid allocation on each
/// access.
pub struct DbPool {
    inner: sqlx::SqlitePool,
    repos: CachedRepos,
}

impl DbPool {
    /// Create a DbPool from an existing SQLite pool.
    /// Primarily useful for testing.
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        let repos = CachedRepos {
            billing: Arc::new(sqlite::SqliteBillingRepo::new(pool.clone())),
            resources: Arc::new(sqlite::SqliteResourceRepo::new(pool.clone())),
        };
        DbPool { inner: pool, repos }
    }

    /// Create a database pool from configuration.
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                Ok(Self::from_sqlite(pool))
            }
        }
    }

    /// Run database migrations using sqlx's migration runner.
    /// This automatically creates and manages a _sqlx_migrations table.
    pub async fn run_migrations(&self) -> DbResult<()> {
        tracing::info!("Running SQLite migrations");
        sqlx::migrate!("./migrations_sqlx/sqlite")
            .run(&self.inner)
            .await?;
        tracing::info!("SQLite migrations completed successfully");
        Ok(())
    }

    /// Get billing repository.
    pub fn billing(&self) -> Arc<dyn BillingRepo> {
        Arc::clone(&self.repos.billing)
    }

    /// Get resource metadata repository.
    pub fn resources(&self) -> Arc<dyn ResourceRepo> {
        Arc::clone(&self.repos.resources)
    }

    /// Health check for database connectivity.
    pub async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.inner).await?;
        Ok(())
    }
}
