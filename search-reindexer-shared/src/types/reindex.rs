//! Sweep outcome and progress types.

use serde::{Deserialize, Serialize};

/// One failure recorded during a sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReindexErrorEntry {
    pub entity_id: String,
    pub error: String,
}

/// Aggregate outcome of a reindex sweep.
///
/// A result is always returned, even on partial failure. `success` is false
/// as soon as one error has been recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReindexResult {
    pub success: bool,
    pub entities_processed: usize,
    pub records_indexed: usize,
    pub records_dropped: usize,
    pub jobs_enqueued: usize,
    pub errors: Vec<ReindexErrorEntry>,
}

impl Default for ReindexResult {
    fn default() -> Self {
        Self {
            success: true,
            entities_processed: 0,
            records_indexed: 0,
            records_dropped: 0,
            jobs_enqueued: 0,
            errors: Vec::new(),
        }
    }
}

impl ReindexResult {
    /// An empty, successful result.
    pub fn new() -> Self {
        Self::default()
    }

    /// An unsuccessful result carrying a single error and no work.
    pub fn failed(entity_id: impl Into<String>, error: impl Into<String>) -> Self {
        let mut result = Self::new();
        result.record_error(entity_id, error);
        result
    }

    /// Record an error and mark the result unsuccessful.
    pub fn record_error(&mut self, entity_id: impl Into<String>, error: impl Into<String>) {
        self.success = false;
        self.errors.push(ReindexErrorEntry {
            entity_id: entity_id.into(),
            error: error.into(),
        });
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: ReindexResult) {
        self.success = self.success && other.success;
        self.entities_processed += other.entities_processed;
        self.records_indexed += other.records_indexed;
        self.records_dropped += other.records_dropped;
        self.jobs_enqueued += other.jobs_enqueued;
        self.errors.extend(other.errors);
    }
}

/// Phase of an entity sweep, reported to progress observers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReindexPhase {
    Starting,
    Fetching,
    Indexing,
    Complete,
}

/// Ephemeral progress snapshot; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReindexProgress {
    pub entity_id: String,
    pub phase: ReindexPhase,
    pub processed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl ReindexProgress {
    pub fn new(
        entity_id: impl Into<String>,
        phase: ReindexPhase,
        processed: u64,
        total: Option<u64>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            phase,
            processed,
            total,
        }
    }
}
