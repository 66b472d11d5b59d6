//! OpenSearch index configuration and mappings.
//!
//! This module defines the per-tenant index naming scheme and the settings and
//! mappings used when an index is (re)created.

use serde_json::{json, Value};

/// Configuration for the full-text indexes.
#[derive(Debug, Clone)]
pub struct FulltextIndexConfig {
    /// Prefix of every tenant index (e.g. "search" gives "search_acme").
    pub prefix: String,
    /// Number of primary shards for newly created indexes.
    pub shards: u32,
    /// Number of replicas for newly created indexes.
    pub replicas: u32,
}

impl FulltextIndexConfig {
    /// Create a new index configuration with one shard and one replica.
    ///
    /// # Arguments
    ///
    /// * `prefix` - The index name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            shards: 1,
            replicas: 1,
        }
    }

    /// Name of the index holding a tenant's records.
    ///
    /// OpenSearch index names must be lowercase and may not contain most
    /// punctuation, so anything other than `[a-z0-9_-]` is replaced by `_`.
    pub fn index_name(&self, tenant_id: &str) -> String {
        format!(
            "{}_{}",
            sanitize_index_segment(&self.prefix),
            sanitize_index_segment(tenant_id)
        )
    }

    /// Get the index settings and mappings for a tenant index.
    ///
    /// The configuration includes:
    /// - **Keyword fields**: entity, record, tenant and organization identifiers for filtering
    /// - **search_as_you_type**: presenter title for autocomplete
    /// - **text**: the free-text body contributed by `build_source`
    /// - **object (disabled)**: raw fields, links and presenter details, stored but not indexed
    pub fn index_settings(&self) -> Value {
        json!({
            "settings": {
                "number_of_shards": self.shards,
                "number_of_replicas": self.replicas
            },
            "mappings": {
                "properties": {
                    "entity_id": { "type": "keyword" },
                    "record_id": { "type": "keyword" },
                    "tenant_id": { "type": "keyword" },
                    "organization_id": { "type": "keyword" },
                    "title": {
                        "type": "search_as_you_type",
                        "fields": {
                            "raw": { "type": "keyword" }
                        }
                    },
                    "subtitle": { "type": "text" },
                    "body": { "type": "text" },
                    "url": { "type": "keyword", "index": false },
                    "fields": { "type": "object", "enabled": false },
                    "links": { "type": "object", "enabled": false },
                    "presenter": { "type": "object", "enabled": false },
                    "indexed_at": { "type": "date" }
                }
            }
        })
    }
}

fn sanitize_index_segment(segment: &str) -> String {
    segment
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_structure() {
        let settings = FulltextIndexConfig::new("search").index_settings();

        assert!(settings["settings"]["number_of_shards"].is_number());
        assert!(settings["settings"]["number_of_replicas"].is_number());

        let properties = &settings["mappings"]["properties"];
        assert_eq!(properties["entity_id"]["type"], "keyword");
        assert_eq!(properties["record_id"]["type"], "keyword");
        assert_eq!(properties["title"]["type"], "search_as_you_type");
        assert_eq!(properties["body"]["type"], "text");
        assert_eq!(properties["fields"]["enabled"], false);
    }

    #[test]
    fn test_index_name() {
        let config = FulltextIndexConfig::new("search");
        assert_eq!(config.index_name("acme"), "search_acme");
        assert_eq!(config.index_name("ACME"), "search_acme");
    }

    #[test]
    fn test_index_name_sanitizes_tenant() {
        let config = FulltextIndexConfig::new("Search");
        assert_eq!(config.index_name("t:1/2 x"), "search_t_1_2_x");
        assert_eq!(
            config.index_name("550e8400-e29b-41d4-a716-446655440000"),
            "search_550e8400-e29b-41d4-a716-446655440000"
        );
    }
}
