//! Search service error types.
//!
//! This module defines the unified error type for all search backend operations,
//! including both low-level strategy errors and facade-level validation errors.

use thiserror::Error;

/// Unified errors from search backend operations.
///
/// Used by the `SearchStrategy` and `SearchService` traits. Includes both
/// low-level backend errors (connection, serialization, etc.) and facade errors
/// (validation, unavailable or unsupported strategies, etc.).
#[derive(Debug, Clone, Error)]
pub enum SearchServiceError {
    /// Validation error (e.g., empty record identifiers).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to establish connection to the search backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to index a record.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Bulk indexing operation failed.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to delete a record.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to purge an entity.
    #[error("Purge error: {0}")]
    PurgeError(String),

    /// Failed to create or recreate the destination index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse a response from the backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The strategy does not implement the requested operation.
    #[error("Strategy '{strategy}' does not support {operation}")]
    Unsupported { strategy: String, operation: String },

    /// One or more strategies failed during a fan-out operation.
    #[error("Strategy '{strategy}' failed: {message}")]
    StrategyFailed { strategy: String, message: String },

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },
}

impl SearchServiceError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create a purge error.
    pub fn purge(msg: impl Into<String>) -> Self {
        Self::PurgeError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(strategy: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            strategy: strategy.into(),
            operation: operation.into(),
        }
    }

    /// Wrap a failure reported by one strategy of a fan-out.
    pub fn strategy_failed(strategy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StrategyFailed {
            strategy: strategy.into(),
            message: message.into(),
        }
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }
}
