//! Database connection management
//!
//! Provides database connection pooling, migrations, and a health check used
//! by the `/health` endpoint.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

use crate::db::error::DbResult;

/// Type alias for the database connection pool
pub type DatabasePool = SqlitePool;

/// Database connection wrapper
#[derive(Clone)]
pub struct DatabaseConnection {
    pool: Arc<DatabasePool>,
}

impl DatabaseConnection {
    /// Create a new database connection from a connection string
    ///
    /// # Arguments
    /// * `database_url` - SQLite connection string (e.g., "sqlite:db.db" or "sqlite::memory:")
    ///
    /// # Returns
    /// A new DatabaseConnection or an sqlx error
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Run migrations on the database
    ///
    /// # Returns
    /// Success or migration error
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await
    }

    /// Perform a health check by running a simple query. Backs the
    /// `/health` endpoint's database reachability check.
    pub async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(())
    }

    /// Close the connection pool gracefully
    ///
    /// Closes all connections in the pool. After this is called,
    /// the connection cannot be used anymore.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
