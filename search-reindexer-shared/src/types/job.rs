//! Queue payload for background indexing.
//!
//! A job carries record references only. Workers reload every referenced
//! record before indexing it, so a job never indexes a stale snapshot.

use serde::{Deserialize, Serialize};

/// Kind of work a queued job describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    BatchIndex,
}

/// Reference to one record to be (re)indexed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordRef {
    pub entity_id: String,
    pub record_id: String,
}

impl RecordRef {
    pub fn new(entity_id: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            record_id: record_id.into(),
        }
    }
}

/// A batch-index job as stored on the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReindexJob {
    pub job_type: JobType,
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub records: Vec<RecordRef>,
}

impl ReindexJob {
    /// Create a batch-index job for the given references.
    pub fn batch_index(
        tenant_id: impl Into<String>,
        organization_id: Option<String>,
        records: Vec<RecordRef>,
    ) -> Self {
        Self {
            job_type: JobType::BatchIndex,
            tenant_id: tenant_id.into(),
            organization_id,
            records,
        }
    }
}
