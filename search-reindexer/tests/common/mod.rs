//! Shared fixtures for the reindexer integration tests: an in-memory record
//! store, recording search strategies and a fully wired indexer.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use search_reindexer::{
    CoverageTracker, EntityConfigRegistry, IndexerConfig, LockConfig, QueueDispatcher,
    ReindexLockManager, SearchIndexer,
};
use search_reindexer_repository::{
    BatchOperationResult, BatchOperationSummary, InMemoryCoverageStore, InMemoryJobQueue,
    InMemoryReindexLockStore, QueryEngine, QueryError, QueryOptions, QueryPage,
    SearchServiceError, SearchStrategy, StrategySearchService,
};
use search_reindexer_shared::{IndexableRecord, RecordFields};

pub const TENANT: &str = "tenant-1";
pub const ITEMS: &str = "catalog:item";
pub const CATEGORIES: &str = "catalog:category";

pub fn fields(value: Value) -> RecordFields {
    value.as_object().cloned().expect("fixture must be a JSON object")
}

pub fn item(id: &str) -> RecordFields {
    fields(json!({ "id": id, "name": format!("Item {}", id) }))
}

/// `count` items named `item-N`; the positions in `without_id` get no `id`.
pub fn items(count: usize, without_id: &[usize]) -> Vec<RecordFields> {
    (0..count)
        .map(|i| {
            if without_id.contains(&i) {
                fields(json!({ "name": format!("Orphan {}", i) }))
            } else {
                item(&format!("item-{}", i))
            }
        })
        .collect()
}

/// Record store answering paging queries from a fixed list per entity.
pub struct MockQueryEngine {
    records: Vec<(String, RecordFields)>,
    fail_on_page: Option<u32>,
    report_total: bool,
    latency: Option<Duration>,
    calls: AtomicUsize,
    skip_flags: Mutex<Vec<bool>>,
}

impl MockQueryEngine {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            fail_on_page: None,
            report_total: true,
            latency: None,
            calls: AtomicUsize::new(0),
            skip_flags: Mutex::new(Vec::new()),
        }
    }

    pub fn with_records(mut self, entity_id: &str, records: Vec<RecordFields>) -> Self {
        self.records
            .extend(records.into_iter().map(|r| (entity_id.to_string(), r)));
        self
    }

    pub fn failing_on_page(mut self, page: u32) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    /// Always report a total of zero, as stores without counts do.
    pub fn without_total(mut self) -> Self {
        self.report_total = false;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn skip_flags(&self) -> Vec<bool> {
        self.skip_flags.lock().await.clone()
    }
}

fn record_id(record: &RecordFields) -> Option<String> {
    match record.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}

#[async_trait]
impl QueryEngine for MockQueryEngine {
    async fn query(&self, entity_id: &str, options: QueryOptions) -> Result<QueryPage, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.skip_flags.lock().await.push(options.skip_auto_reindex);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_on_page == Some(options.page.page) {
            return Err(QueryError::failed("connection reset by peer"));
        }

        let wanted_id = options.filters.get("id").and_then(Value::as_str);
        let matching: Vec<&RecordFields> = self
            .records
            .iter()
            .filter(|(entity, _)| entity == entity_id)
            .map(|(_, record)| record)
            .filter(|record| {
                let id = record_id(record);
                if let Some(wanted) = wanted_id {
                    return id.as_deref() == Some(wanted);
                }
                match (options.partition, id) {
                    (None, _) => true,
                    (Some(partition), Some(id)) => partition.owns(&id),
                    (Some(partition), None) => partition.index == 0,
                }
            })
            .collect();

        let size = options.page.page_size as usize;
        let start = (options.page.page.saturating_sub(1) as usize) * size;
        let items = matching
            .iter()
            .skip(start)
            .take(size)
            .map(|record| (*record).clone())
            .collect();

        Ok(QueryPage {
            items,
            total: if self.report_total {
                matching.len() as u64
            } else {
                0
            },
        })
    }
}

/// Search strategy keeping every record it accepts.
pub struct RecordingStrategy {
    id: &'static str,
    available: bool,
    fail_bulk_call: Option<usize>,
    fail_records: HashSet<String>,
    records: Mutex<Vec<IndexableRecord>>,
    purged: Mutex<Vec<String>>,
    bulk_calls: AtomicUsize,
    recreated: AtomicUsize,
}

impl RecordingStrategy {
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            available: true,
            fail_bulk_call: None,
            fail_records: HashSet::new(),
            records: Mutex::new(Vec::new()),
            purged: Mutex::new(Vec::new()),
            bulk_calls: AtomicUsize::new(0),
            recreated: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Fail the `call`-th bulk call (1-based) as a whole.
    pub fn failing_bulk_call(mut self, call: usize) -> Self {
        self.fail_bulk_call = Some(call);
        self
    }

    pub fn failing_records(mut self, record_ids: &[&str]) -> Self {
        self.fail_records = record_ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub async fn records(&self) -> Vec<IndexableRecord> {
        self.records.lock().await.clone()
    }

    pub async fn record_ids(&self) -> Vec<String> {
        self.records
            .lock()
            .await
            .iter()
            .map(|r| r.record_id.clone())
            .collect()
    }

    pub async fn purged(&self) -> Vec<String> {
        self.purged.lock().await.clone()
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn recreated(&self) -> usize {
        self.recreated.load(Ordering::SeqCst)
    }

    async fn store(&self, record: &IndexableRecord) {
        let mut records = self.records.lock().await;
        records.retain(|r| r.document_id() != record.document_id());
        records.push(record.clone());
    }
}

#[async_trait]
impl SearchStrategy for RecordingStrategy {
    fn id(&self) -> &str {
        self.id
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn index(&self, record: &IndexableRecord) -> Result<(), SearchServiceError> {
        if self.fail_records.contains(&record.record_id) {
            return Err(SearchServiceError::index(format!(
                "rejected {}",
                record.record_id
            )));
        }
        self.store(record).await;
        Ok(())
    }

    async fn delete(
        &self,
        entity_id: &str,
        record_id: &str,
        _tenant_id: &str,
    ) -> Result<(), SearchServiceError> {
        self.records
            .lock()
            .await
            .retain(|r| !(r.entity_id == entity_id && r.record_id == record_id));
        Ok(())
    }

    async fn purge(&self, entity_id: &str, _tenant_id: &str) -> Result<(), SearchServiceError> {
        self.records.lock().await.retain(|r| r.entity_id != entity_id);
        self.purged.lock().await.push(entity_id.to_string());
        Ok(())
    }

    async fn bulk_index(
        &self,
        records: &[IndexableRecord],
    ) -> Result<BatchOperationSummary, SearchServiceError> {
        let call = self.bulk_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_bulk_call == Some(call) {
            return Err(SearchServiceError::bulk_index("bulk request timed out"));
        }

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            results.push(match self.index(record).await {
                Ok(()) => BatchOperationResult::succeeded(
                    &record.entity_id,
                    &record.record_id,
                ),
                Err(e) => BatchOperationResult::failed(
                    &record.entity_id,
                    &record.record_id,
                    e,
                ),
            });
        }
        Ok(BatchOperationSummary::from_results(results))
    }

    async fn recreate_index(&self, _tenant_id: &str) -> Result<(), SearchServiceError> {
        self.recreated.fetch_add(1, Ordering::SeqCst);
        self.records.lock().await.clear();
        Ok(())
    }
}

/// An indexer wired to in-memory collaborators, with handles on all of them.
pub struct Harness {
    pub indexer: SearchIndexer,
    pub engine: Arc<MockQueryEngine>,
    pub fulltext: Arc<RecordingStrategy>,
    pub vector: Arc<RecordingStrategy>,
    pub lock_manager: ReindexLockManager,
    pub coverage: CoverageTracker,
    pub fulltext_queue: Arc<InMemoryJobQueue>,
    pub vector_queue: Arc<InMemoryJobQueue>,
}

impl Harness {
    pub fn new(registry: EntityConfigRegistry, engine: MockQueryEngine) -> Self {
        Self::with_strategies(
            registry,
            engine,
            RecordingStrategy::new("fulltext"),
            RecordingStrategy::new("vector"),
        )
    }

    pub fn with_strategies(
        registry: EntityConfigRegistry,
        engine: MockQueryEngine,
        fulltext: RecordingStrategy,
        vector: RecordingStrategy,
    ) -> Self {
        let engine = Arc::new(engine);
        let fulltext = Arc::new(fulltext);
        let vector = Arc::new(vector);
        let service = Arc::new(StrategySearchService::new(vec![
            fulltext.clone() as Arc<dyn SearchStrategy>,
            vector.clone() as Arc<dyn SearchStrategy>,
        ]));

        let lock_manager = ReindexLockManager::new(
            Arc::new(InMemoryReindexLockStore::new()),
            LockConfig::new(chrono::Duration::seconds(60)),
        );
        let coverage = CoverageTracker::new(Arc::new(InMemoryCoverageStore::new()));
        let fulltext_queue = Arc::new(InMemoryJobQueue::new(search_reindexer::FULLTEXT_QUEUE));
        let vector_queue = Arc::new(InMemoryJobQueue::new(search_reindexer::VECTOR_QUEUE));

        let indexer = SearchIndexer::new(registry, engine.clone(), service)
            .with_queue_dispatcher(
                QueueDispatcher::new()
                    .with_fulltext_queue(fulltext_queue.clone())
                    .with_vector_queue(vector_queue.clone()),
            )
            .with_lock_manager(lock_manager.clone())
            .with_coverage_tracker(coverage.clone());

        Self {
            indexer,
            engine,
            fulltext,
            vector,
            lock_manager,
            coverage,
            fulltext_queue,
            vector_queue,
        }
    }

    /// Replace the indexer tuning, keeping every collaborator.
    pub fn with_indexer_config(mut self, config: IndexerConfig) -> Self {
        self.indexer = self.indexer.with_config(config);
        self
    }
}
