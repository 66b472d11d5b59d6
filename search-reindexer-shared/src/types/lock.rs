//! Reindex lock rows and the backend kinds they guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The search backends a sweep can target.
///
/// The string form doubles as the strategy ID registered with the search
/// service and as the lock type column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Fulltext,
    Vector,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Fulltext, BackendKind::Vector];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fulltext => "fulltext",
            Self::Vector => "vector",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fulltext" => Ok(Self::Fulltext),
            "vector" => Ok(Self::Vector),
            other => Err(format!("unknown backend kind '{}'", other)),
        }
    }
}

/// Mutual-exclusion record for one `(lock_type, tenant_id)` pair.
///
/// `heartbeat_at` is refreshed whenever progress is reported; staleness is
/// measured against it rather than against `started_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReindexLock {
    pub lock_type: BackendKind,
    pub action: String,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub heartbeat_at: DateTime<Utc>,
    pub processed_count: u64,
    pub total_count: u64,
}

impl ReindexLock {
    /// Create a fresh lock with zeroed progress.
    pub fn new(
        lock_type: BackendKind,
        action: impl Into<String>,
        tenant_id: impl Into<String>,
        organization_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            lock_type,
            action: action.into(),
            tenant_id: tenant_id.into(),
            organization_id,
            started_at: now,
            heartbeat_at: now,
            processed_count: 0,
            total_count: 0,
        }
    }
}
