//! R-kive Common Library
//!
//! Shared code for the R-kive services including:
//! - Database entities and the repository over the hosted Postgres
//! - Error types and handling
//! - Configuration management
//! - Explicit session context derived from access tokens
//! - Realtime table-change event bus
//! - Metrics and logging setup

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod telemetry;

// Re-export commonly used types
pub use auth::{Role, Session, SessionVerifier};
pub use config::AppConfig;
pub use db::{DbPool, PaperSource, Repository};
pub use errors::{AppError, Result};
pub use events::{EventBus, Subscription, TableEvent};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
