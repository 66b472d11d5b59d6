//! Backend-ready record types.
//!
//! An [`IndexableRecord`] is one domain record translated into the shape every
//! search strategy accepts. It is built fresh for each index call and never
//! persisted by the reindexer itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field map of a domain record as returned by the record store.
pub type RecordFields = Map<String, Value>;

/// Free text contributed for full-text and embedding backends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RecordText {
    Single(String),
    Multiple(Vec<String>),
}

impl RecordText {
    /// Flatten the text into one string, joining multiple parts with newlines.
    pub fn joined(&self) -> String {
        match self {
            Self::Single(text) => text.clone(),
            Self::Multiple(parts) => parts.join("\n"),
        }
    }

    /// Returns true when there is no non-whitespace text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Single(text) => text.trim().is_empty(),
            Self::Multiple(parts) => parts.iter().all(|p| p.trim().is_empty()),
        }
    }
}

impl From<String> for RecordText {
    fn from(text: String) -> Self {
        Self::Single(text)
    }
}

impl From<Vec<String>> for RecordText {
    fn from(parts: Vec<String>) -> Self {
        Self::Multiple(parts)
    }
}

/// Backend-agnostic display descriptor attached to an indexed record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Presenter {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

impl Presenter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}

/// A navigable link shown next to a search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordLink {
    pub href: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl RecordLink {
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            label: label.into(),
            kind: None,
        }
    }
}

/// One domain record in backend-ready form.
///
/// # Fields
///
/// - `entity_id`: Registry key of the entity type (e.g. `catalog:item`)
/// - `record_id`: Identifier of the record within the entity type
/// - `tenant_id` / `organization_id`: Multi-tenancy scope
/// - `fields`: Record fields with extension-field prefixes stripped
/// - `text`: Optional free text contributed by the `build_source` hook
/// - `presenter`, `url`, `links`: Display data for search results
/// - `checksum_source`: Opaque value used to detect stale index entries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexableRecord {
    pub entity_id: String,
    pub record_id: String,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub fields: RecordFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<RecordText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presenter: Option<Presenter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<RecordLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum_source: Option<Value>,
}

impl IndexableRecord {
    /// Create a record with only identity, scope and fields set.
    pub fn new(
        entity_id: impl Into<String>,
        record_id: impl Into<String>,
        tenant_id: impl Into<String>,
        organization_id: Option<String>,
        fields: RecordFields,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            record_id: record_id.into(),
            tenant_id: tenant_id.into(),
            organization_id,
            fields,
            text: None,
            presenter: None,
            url: None,
            links: None,
            checksum_source: None,
        }
    }

    /// Generate the document ID used by search backends.
    ///
    /// Records are unique per entity type, so the ID combines both keys.
    pub fn document_id(&self) -> String {
        format!("{}:{}", self.entity_id, self.record_id)
    }
}
