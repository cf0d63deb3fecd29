//! Error types for the PostgreSQL storage backend.

use grantvault_core::{RecordKind, StoreError};
use sqlx_core::error::Error as SqlxError;

/// Errors raised while setting up the PostgreSQL backend.
///
/// Store operations themselves report [`StoreError`].
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] SqlxError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StoreError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => db_error(e),
            PostgresError::Migration(e) => StoreError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StoreError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL setup operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

/// Returns `true` when the driver could not reach the database at all.
fn is_connection_failure(err: &SqlxError) -> bool {
    matches!(
        err,
        SqlxError::Io(_)
            | SqlxError::Tls(_)
            | SqlxError::PoolTimedOut
            | SqlxError::PoolClosed
            | SqlxError::WorkerCrashed
    )
}

/// Converts a driver error from a read or delete.
pub(crate) fn db_error(err: SqlxError) -> StoreError {
    if is_connection_failure(&err) {
        StoreError::unavailable(err.to_string())
    } else {
        StoreError::internal(format!("Database error: {err}"))
    }
}

/// Converts a driver error from an insert, mapping unique violations.
pub(crate) fn insert_error(kind: RecordKind, key: &str, err: SqlxError) -> StoreError {
    if let SqlxError::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return StoreError::duplicate_key(kind, key);
    }
    db_error(err)
}
