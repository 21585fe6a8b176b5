//! Database layer
//!
//! Provides:
//! - SeaORM entity models
//! - The `Store` capability interface
//! - `Repository`, the transactional Postgres implementation
//! - `MemoryStore`, a deterministic in-memory implementation for tests
//! - Connection pool management and migrations

pub mod memory;
pub mod models;
mod repository;
mod store;

pub use memory::MemoryStore;
pub use repository::Repository;
pub use store::{
    merge_article, ArticleFields, ClusterRecord, DateRange, MergedArticle, RawScores, ScoreRecord,
    Store,
};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(true);

        let conn = Database::connect(opts).await.map_err(|e| AppError::Internal {
            message: format!("failed to connect to database: {}", e),
        })?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply pending SQL migrations
    pub async fn run_migrations(&self) -> Result<()> {
        let pool = self.conn.get_postgres_connection_pool();
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| AppError::Internal {
                message: format!("migration failed: {}", e),
            })?;

        info!("Migrations applied");
        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;

        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::Internal {
                message: format!("ping failed: {}", e),
            })?;

        Ok(())
    }
}
