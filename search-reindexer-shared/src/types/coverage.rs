//! Coverage counts per indexing scope.

use serde::{Deserialize, Serialize};

use crate::types::lock::BackendKind;

/// Number of records a backend currently holds for one
/// `(entity, tenant, organization-or-null)` scope.
///
/// `organization_id = None` is the tenant-wide scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoverageCount {
    pub backend: BackendKind,
    pub entity_type: String,
    pub tenant_id: String,
    pub organization_id: Option<String>,
    pub indexed_count: u64,
    pub with_deleted: bool,
}

impl CoverageCount {
    pub fn new(
        backend: BackendKind,
        entity_type: impl Into<String>,
        tenant_id: impl Into<String>,
        organization_id: Option<String>,
        indexed_count: u64,
    ) -> Self {
        Self {
            backend,
            entity_type: entity_type.into(),
            tenant_id: tenant_id.into(),
            organization_id,
            indexed_count,
            with_deleted: false,
        }
    }

    /// A zero count for the given scope, as written after a purge.
    pub fn zero(
        backend: BackendKind,
        entity_type: impl Into<String>,
        tenant_id: impl Into<String>,
        organization_id: Option<String>,
    ) -> Self {
        Self::new(backend, entity_type, tenant_id, organization_id, 0)
    }
}
