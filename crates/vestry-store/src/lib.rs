//! Vestry Store - Audit event persistence
//!
//! SQLite-based storage for:
//! - The append-only audit event log
//! - Review-workflow state (flags, review notes)
//! - Statistics aggregations
//! - Admin/member directory lookups
//!
//! ## Architecture
//!
//! This crate implements the `IEventStore` and `IDirectory` ports from
//! `vestry-core` using SQLite as the storage backend. It is a driven
//! (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteEventStore`] - Full `IEventStore` implementation
//! - [`SqliteDirectory`] - Read-only `IDirectory` implementation
//! - [`StoreError`] - Error types for storage operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use vestry_store::{DatabasePool, SqliteEventStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/vestry/audit.db")).await?;
//! let store = SqliteEventStore::new(pool.pool().clone());
//! // Use store as IEventStore...
//! # Ok(())
//! # }
//! ```

pub mod directory;
pub mod pool;
pub mod store;

pub use directory::SqliteDirectory;
pub use pool::DatabasePool;
pub use store::SqliteEventStore;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
