//! Storage error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not create the directory holding the database file.
    #[error("creating database directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not open or connect to the database.
    #[error("connecting to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Schema bootstrap failed.
    #[error("initializing database schema: {0}")]
    Schema(#[source] sqlx::Error),

    /// A statement failed (unreachable pool, constraint violation, ...).
    #[error("{operation}: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StorageError {
    /// Build a `map_err` adapter tagging a sqlx error with the failing operation.
    pub(crate) fn query(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Query { operation, source }
    }
}
