//! Database layer for R-kive
//!
//! Provides:
//! - SeaORM entity models for papers and citation edges
//! - Repository pattern for data access
//! - Connection management for the hosted Postgres (primary + optional replica)
//! - The [`PaperSource`] seam used by related-paper ranking

pub mod models;
mod repository;

pub use repository::Repository;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use models::Paper;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Read access to the paper collection, as needed by similarity ranking.
///
/// Implementations return at most `limit` papers and never the paper
/// identified by `exclude_id`. Any failure is reported as a whole; partial
/// results are not a thing.
#[async_trait]
pub trait PaperSource: Send + Sync {
    async fn fetch_candidate_papers(&self, exclude_id: Uuid, limit: u64) -> Result<Vec<Paper>>;
}

/// Database connection pool wrapper; clones share the same connections
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: Arc<DatabaseConnection>,

    /// Read replica connection (optional)
    pub replica: Option<Arc<DatabaseConnection>>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");
        let primary = Arc::new(connect(&config.url, config, "primary").await?);

        let replica = match config.read_url {
            Some(ref read_url) => {
                info!("Connecting to read replica...");
                Some(Arc::new(connect(read_url, config, "replica").await?))
            }
            None => None,
        };

        info!(replica = replica.is_some(), "Database connections established");

        Ok(Self { primary, replica })
    }

    /// Wrap an existing connection (used with sea-orm's mock backend in tests)
    pub fn from_connection(primary: DatabaseConnection) -> Self {
        Self {
            primary: Arc::new(primary),
            replica: None,
        }
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_deref().unwrap_or(&*self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }
}

async fn connect(url: &str, config: &DatabaseConfig, role: &str) -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(false);

    Database::connect(opts)
        .await
        .map_err(|e| AppError::DatabaseConnection {
            message: format!("Failed to connect to {}: {}", role, e),
        })
}
