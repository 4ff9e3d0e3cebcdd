//! DavSync Cache - Local state persistence
//!
//! SQLite-based storage for:
//! - Accounts and their sync status
//! - Folder registries, in persisted order
//!
//! ## Architecture
//!
//! This crate implements the `IStateRepository` port from `davsync-core`
//! using SQLite as the storage backend. It is a driven (secondary) adapter
//! in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteStateRepository`] - `IStateRepository` implementation
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use davsync_cache::{DatabasePool, SqliteStateRepository};
//! use davsync_core::config::Config;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let db = DatabasePool::open(&config.storage).await?;
//! let repo = SqliteStateRepository::new(db.pool().clone());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod pool;
pub mod repository;

pub use pool::{DatabasePool, SCHEMA_VERSION};
pub use repository::SqliteStateRepository;

/// Errors raised by the state database
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// SQLite rejected a connection or a statement
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The directory holding the database could not be created
    #[error("Cannot create {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The database was written by a newer DavSync
    #[error("Schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    /// A schema migration step failed
    #[error("Schema migration {version} failed: {source}")]
    Migration { version: u32, source: sqlx::Error },

    /// A value could not be converted between its domain and stored form
    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}
