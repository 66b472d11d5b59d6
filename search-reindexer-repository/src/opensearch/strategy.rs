//! OpenSearch strategy implementation.
//!
//! This module provides the full-text `SearchStrategy` using the OpenSearch
//! Rust crate. Each tenant gets its own index, which makes `recreate_index`
//! an atomic "start clean" for one tenant.

use async_trait::async_trait;
use chrono::Utc;
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts},
    BulkParts, DeleteByQueryParts, DeleteParts, IndexParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchServiceError;
use crate::interfaces::SearchStrategy;
use crate::opensearch::index_config::FulltextIndexConfig;
use crate::types::{BatchOperationResult, BatchOperationSummary};
use search_reindexer_shared::{BackendKind, IndexableRecord};

/// OpenSearch full-text strategy.
///
/// # Example
///
/// ```ignore
/// use search_reindexer_repository::opensearch::{FulltextIndexConfig, OpenSearchStrategy};
///
/// let strategy = OpenSearchStrategy::new("http://localhost:9200", FulltextIndexConfig::new("search")).await?;
/// strategy.recreate_index("tenant-1").await?;
/// strategy.index(&record).await?;
/// ```
pub struct OpenSearchStrategy {
    client: OpenSearch,
    index_config: FulltextIndexConfig,
}

impl OpenSearchStrategy {
    /// Create a new OpenSearch strategy connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - Index prefix and creation settings
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchStrategy)` - A new strategy instance
    /// * `Err(SearchServiceError)` - If connection setup fails
    pub async fn new(url: &str, index_config: FulltextIndexConfig) -> Result<Self, SearchServiceError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchServiceError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchServiceError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            prefix = %index_config.prefix,
            "Created OpenSearch strategy"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// Build the stored document for a record.
    ///
    /// When the record carries no free text, string-valued fields are joined
    /// into the searchable body instead.
    fn document_body(record: &IndexableRecord) -> Value {
        let body = match &record.text {
            Some(text) if !text.is_blank() => text.joined(),
            _ => record
                .fields
                .values()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        };

        json!({
            "entity_id": record.entity_id,
            "record_id": record.record_id,
            "tenant_id": record.tenant_id,
            "organization_id": record.organization_id,
            "title": record.presenter.as_ref().map(|p| p.title.clone()),
            "subtitle": record.presenter.as_ref().and_then(|p| p.subtitle.clone()),
            "body": body,
            "url": record.url,
            "fields": record.fields,
            "links": record.links,
            "presenter": record.presenter,
            "indexed_at": Utc::now().to_rfc3339(),
        })
    }

    /// Map a bulk API response onto the submitted records, in order.
    fn parse_bulk_response(
        records: &[IndexableRecord],
        response: &Value,
    ) -> Result<BatchOperationSummary, SearchServiceError> {
        let items = response["items"]
            .as_array()
            .ok_or_else(|| SearchServiceError::parse("bulk response has no items"))?;

        if items.len() != records.len() {
            return Err(SearchServiceError::parse(format!(
                "bulk response has {} items for {} records",
                items.len(),
                records.len()
            )));
        }

        let results = records
            .iter()
            .zip(items)
            .map(|(record, item)| {
                let outcome = &item["index"];
                let status = outcome["status"].as_u64().unwrap_or(0);
                if (200..300).contains(&status) {
                    BatchOperationResult::succeeded(&record.entity_id, &record.record_id)
                } else {
                    let reason = outcome["error"]["reason"]
                        .as_str()
                        .unwrap_or("unknown bulk item failure");
                    BatchOperationResult::failed(
                        &record.entity_id,
                        &record.record_id,
                        SearchServiceError::index(format!("status {}: {}", status, reason)),
                    )
                }
            })
            .collect();

        Ok(BatchOperationSummary::from_results(results))
    }

    async fn read_error_body(response: opensearch::http::response::Response) -> String {
        response.text().await.unwrap_or_default()
    }
}

#[async_trait]
impl SearchStrategy for OpenSearchStrategy {
    fn id(&self) -> &str {
        BackendKind::Fulltext.as_str()
    }

    async fn is_available(&self) -> bool {
        match self.client.ping().send().await {
            Ok(response) => response.status_code().is_success(),
            Err(e) => {
                debug!(error = %e, "OpenSearch ping failed");
                false
            }
        }
    }

    async fn index(&self, record: &IndexableRecord) -> Result<(), SearchServiceError> {
        let index = self.index_config.index_name(&record.tenant_id);
        let doc_id = record.document_id();

        let response = self
            .client
            .index(IndexParts::IndexId(&index, &doc_id))
            .body(Self::document_body(record))
            .send()
            .await
            .map_err(|e| SearchServiceError::index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::read_error_body(response).await;
            error!(status = %status, body = %error_body, "Index request failed");
            return Err(SearchServiceError::index(format!(
                "Index failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(index = %index, doc_id = %doc_id, "Document indexed");
        Ok(())
    }

    async fn delete(
        &self,
        entity_id: &str,
        record_id: &str,
        tenant_id: &str,
    ) -> Result<(), SearchServiceError> {
        let index = self.index_config.index_name(tenant_id);
        let doc_id = format!("{}:{}", entity_id, record_id);

        let response = self
            .client
            .delete(DeleteParts::IndexId(&index, &doc_id))
            .send()
            .await
            .map_err(|e| SearchServiceError::delete(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - document may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = Self::read_error_body(response).await;
            error!(status = %status, body = %error_body, "Delete request failed");
            return Err(SearchServiceError::delete(format!(
                "Delete failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(index = %index, doc_id = %doc_id, "Document deleted");
        Ok(())
    }

    async fn purge(&self, entity_id: &str, tenant_id: &str) -> Result<(), SearchServiceError> {
        let index = self.index_config.index_name(tenant_id);

        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[&index]))
            .body(json!({
                "query": { "term": { "entity_id": entity_id } }
            }))
            .send()
            .await
            .map_err(|e| SearchServiceError::purge(e.to_string()))?;

        let status = response.status_code();

        // 404 means the tenant index does not exist yet: nothing to purge
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = Self::read_error_body(response).await;
            error!(status = %status, body = %error_body, "Purge request failed");
            return Err(SearchServiceError::purge(format!(
                "Purge failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %index, entity_id = %entity_id, "Entity purged from full-text index");
        Ok(())
    }

    async fn bulk_index(
        &self,
        records: &[IndexableRecord],
    ) -> Result<BatchOperationSummary, SearchServiceError> {
        if records.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        // Bulk requests target a single tenant index.
        let index = self.index_config.index_name(&records[0].tenant_id);
        if records
            .iter()
            .any(|r| self.index_config.index_name(&r.tenant_id) != index)
        {
            return Err(SearchServiceError::validation(
                "bulk batch spans multiple tenants",
            ));
        }

        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(records.len() * 2);
        for record in records {
            body.push(JsonBody::new(json!({ "index": { "_id": record.document_id() } })));
            body.push(JsonBody::new(Self::document_body(record)));
        }

        let response = self
            .client
            .bulk(BulkParts::Index(&index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchServiceError::bulk_index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::read_error_body(response).await;
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchServiceError::bulk_index(format!(
                "Bulk failed with status {}: {}",
                status, error_body
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| SearchServiceError::parse(e.to_string()))?;
        let summary = Self::parse_bulk_response(records, &payload)?;

        debug!(
            index = %index,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk indexed documents"
        );
        Ok(summary)
    }

    async fn recreate_index(&self, tenant_id: &str) -> Result<(), SearchServiceError> {
        let index = self.index_config.index_name(tenant_id);

        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[&index]))
            .send()
            .await
            .map_err(|e| SearchServiceError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = Self::read_error_body(response).await;
            return Err(SearchServiceError::index_creation(format!(
                "Dropping index {} failed with status {}: {}",
                index, status, error_body
            )));
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&index))
            .body(self.index_config.index_settings())
            .send()
            .await
            .map_err(|e| SearchServiceError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = Self::read_error_body(response).await;
            error!(status = %status, body = %error_body, "Index creation failed");
            return Err(SearchServiceError::index_creation(format!(
                "Creating index {} failed with status {}: {}",
                index, status, error_body
            )));
        }

        info!(index = %index, tenant_id = %tenant_id, "Recreated full-text index");
        Ok(())
    }
}
