//! Parameters and outcomes of the indexer operations.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use search_reindexer_repository::Partition;
use search_reindexer_shared::{BackendKind, RecordFields, ReindexProgress};

/// Observer invoked synchronously at every sweep phase transition.
pub type ProgressCallback = Arc<dyn Fn(ReindexProgress) + Send + Sync>;

/// Index one record from its raw fields.
#[derive(Debug, Clone)]
pub struct IndexRecordParams {
    pub entity_id: String,
    /// Explicit identifier. When absent, the record's `id` field is used.
    pub record_id: Option<String>,
    pub tenant_id: String,
    pub organization_id: Option<String>,
    pub record: RecordFields,
    /// Extension fields already extracted by the caller. They take precedence
    /// over prefixed keys found in `record`.
    pub custom_fields: RecordFields,
    /// Restrict indexing to one backend instead of every strategy.
    pub backend: Option<BackendKind>,
}

impl IndexRecordParams {
    pub fn new(
        entity_id: impl Into<String>,
        tenant_id: impl Into<String>,
        record: RecordFields,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            record_id: None,
            tenant_id: tenant_id.into(),
            organization_id: None,
            record,
            custom_fields: RecordFields::new(),
            backend: None,
        }
    }

    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn with_organization(mut self, organization_id: Option<String>) -> Self {
        self.organization_id = organization_id;
        self
    }

    pub fn with_custom_fields(mut self, custom_fields: RecordFields) -> Self {
        self.custom_fields = custom_fields;
        self
    }

    pub fn for_backend(mut self, backend: Option<BackendKind>) -> Self {
        self.backend = backend;
        self
    }
}

/// Reload one record from the record store and index it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexByIdParams {
    pub entity_id: String,
    pub record_id: String,
    pub tenant_id: String,
    pub organization_id: Option<String>,
    pub backend: Option<BackendKind>,
}

impl IndexByIdParams {
    pub fn new(
        entity_id: impl Into<String>,
        record_id: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            record_id: record_id.into(),
            tenant_id: tenant_id.into(),
            organization_id: None,
            backend: None,
        }
    }

    pub fn with_organization(mut self, organization_id: Option<String>) -> Self {
        self.organization_id = organization_id;
        self
    }

    pub fn for_backend(mut self, backend: Option<BackendKind>) -> Self {
        self.backend = backend;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRecordParams {
    pub entity_id: String,
    pub record_id: String,
    pub tenant_id: String,
}

impl DeleteRecordParams {
    pub fn new(
        entity_id: impl Into<String>,
        record_id: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            record_id: record_id.into(),
            tenant_id: tenant_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeEntityParams {
    pub entity_id: String,
    pub tenant_id: String,
}

impl PurgeEntityParams {
    pub fn new(entity_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            tenant_id: tenant_id.into(),
        }
    }
}

/// Parameters of a sweep across every strategy.
#[derive(Clone, Default)]
pub struct ReindexParams {
    pub tenant_id: String,
    pub organization_id: Option<String>,
    pub purge_first: bool,
    pub on_progress: Option<ProgressCallback>,
}

impl ReindexParams {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            ..Default::default()
        }
    }

    pub fn with_organization(mut self, organization_id: Option<String>) -> Self {
        self.organization_id = organization_id;
        self
    }

    pub fn with_purge_first(mut self, purge_first: bool) -> Self {
        self.purge_first = purge_first;
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }
}

impl fmt::Debug for ReindexParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReindexParams")
            .field("tenant_id", &self.tenant_id)
            .field("organization_id", &self.organization_id)
            .field("purge_first", &self.purge_first)
            .finish_non_exhaustive()
    }
}

/// Parameters of a full-text or vector sweep.
///
/// `recreate_index` only applies to full-text sweeps and `purge_first` only
/// to vector sweeps.
#[derive(Clone, Default)]
pub struct BackendReindexParams {
    pub tenant_id: String,
    pub organization_id: Option<String>,
    /// Enqueue record references instead of indexing directly.
    pub use_queue: bool,
    pub recreate_index: bool,
    pub purge_first: bool,
    /// Overrides the indexer's page size.
    pub page_size: Option<u32>,
    /// Restrict the sweep to one shard of the record space.
    pub partition: Option<Partition>,
    pub on_progress: Option<ProgressCallback>,
}

impl BackendReindexParams {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            ..Default::default()
        }
    }

    pub fn with_organization(mut self, organization_id: Option<String>) -> Self {
        self.organization_id = organization_id;
        self
    }

    pub fn with_queue(mut self, use_queue: bool) -> Self {
        self.use_queue = use_queue;
        self
    }

    pub fn with_recreate_index(mut self, recreate_index: bool) -> Self {
        self.recreate_index = recreate_index;
        self
    }

    pub fn with_purge_first(mut self, purge_first: bool) -> Self {
        self.purge_first = purge_first;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }
}

impl fmt::Debug for BackendReindexParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendReindexParams")
            .field("tenant_id", &self.tenant_id)
            .field("organization_id", &self.organization_id)
            .field("use_queue", &self.use_queue)
            .field("recreate_index", &self.recreate_index)
            .field("purge_first", &self.purge_first)
            .field("page_size", &self.page_size)
            .field("partition", &self.partition)
            .finish_non_exhaustive()
    }
}

/// Why a single-record operation did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    EntityNotConfigured,
    MissingIdentifier,
    RecordNotFound,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntityNotConfigured => "entity-not-configured",
            Self::MissingIdentifier => "missing-identifier",
            Self::RecordNotFound => "record-not-found",
        }
    }
}

/// Outcome of `index_record` and `index_record_by_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "reason", rename_all = "lowercase")]
pub enum IndexOutcome {
    Indexed,
    Skipped(SkipReason),
}

impl IndexOutcome {
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed)
    }
}
