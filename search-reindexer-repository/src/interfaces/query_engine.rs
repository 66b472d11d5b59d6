//! Paging query contract over the record store.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::QueryError;
use search_reindexer_shared::RecordFields;

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }
}

/// Sharding key restricting a query to one slice of the record space.
///
/// A record belongs to the partition `hash(record_id) % count == index`,
/// where `hash` is a stable FNV-1a hash so every process agrees on the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub index: u32,
    pub count: u32,
}

impl Partition {
    pub fn new(index: u32, count: u32) -> Self {
        Self { index, count }
    }

    /// Every partition of a sweep split `count` ways.
    pub fn all(count: u32) -> impl Iterator<Item = Partition> {
        (0..count).map(move |index| Partition { index, count })
    }

    /// Returns true if `record_id` belongs to this partition.
    pub fn owns(&self, record_id: &str) -> bool {
        if self.count <= 1 {
            return true;
        }
        (stable_hash(record_id) % u64::from(self.count)) == u64::from(self.index)
    }
}

fn stable_hash(value: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    value.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Options of a paging query.
///
/// `skip_auto_reindex` must be honoured by implementations: a query issued with
/// it set must not schedule any automatic reindexing of the records it reads.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub tenant_id: String,
    pub organization_id: Option<String>,
    pub filters: Map<String, Value>,
    pub page: PageRequest,
    pub include_custom_fields: bool,
    pub skip_auto_reindex: bool,
    pub partition: Option<Partition>,
}

impl QueryOptions {
    /// Options for one page of a tenant/organization scope, with no filters.
    pub fn page(
        tenant_id: impl Into<String>,
        organization_id: Option<String>,
        page: PageRequest,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            organization_id,
            filters: Map::new(),
            page,
            include_custom_fields: true,
            skip_auto_reindex: true,
            partition: None,
        }
    }
}

/// One page of records plus the total number matching the query.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub items: Vec<RecordFields>,
    pub total: u64,
}

/// Paginated read access to domain records.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Fetch one page of records of `entity_id`.
    async fn query(&self, entity_id: &str, options: QueryOptions) -> Result<QueryPage, QueryError>;
}
