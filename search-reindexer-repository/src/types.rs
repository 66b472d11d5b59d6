//! Request and response types for search backend operations.

use crate::errors::SearchServiceError;

/// Result of a batch operation for a single record.
///
/// This struct represents the outcome of one record within a bulk index call.
/// It indicates whether the operation succeeded and includes error details if
/// it failed.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// Registry key of the record's entity type.
    pub entity_id: String,
    /// The record's identifier.
    pub record_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchServiceError>,
}

impl BatchOperationResult {
    pub fn succeeded(entity_id: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            record_id: record_id.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(
        entity_id: impl Into<String>,
        record_id: impl Into<String>,
        error: SearchServiceError,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            record_id: record_id.into(),
            success: false,
            error: Some(error),
        }
    }
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// This allows callers to handle partial failures gracefully.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of records in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each record.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary from individual results.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Iterate over the failed results only.
    pub fn failures(&self) -> impl Iterator<Item = &BatchOperationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Filter for listing entries held by a vector strategy.
#[derive(Debug, Clone)]
pub struct EntryQuery {
    pub entity_id: String,
    pub tenant_id: String,
    pub organization_id: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

/// One entry held by a search backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEntry {
    pub entity_id: String,
    pub record_id: String,
    pub organization_id: Option<String>,
}
