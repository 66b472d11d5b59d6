//! Errors raised by the record store query layer.

use thiserror::Error;

/// Failure of a paging query against the record store.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// The entity is unknown to the record store.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// The query could not be executed.
    #[error("Query failed: {0}")]
    Failed(String),
}

impl QueryError {
    /// Create a generic query failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}
