//! Errors raised by the lock and coverage stores.

use thiserror::Error;

/// Represents errors that can occur within the lock and coverage stores.
///
/// Consolidates database, migration and row-decoding failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A stored row could not be mapped back to a domain value.
    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

impl StoreError {
    /// Create an invalid row error.
    pub fn invalid_row(msg: impl Into<String>) -> Self {
        Self::InvalidRow(msg.into())
    }
}
