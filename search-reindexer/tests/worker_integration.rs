//! Integration tests for queue dispatch and the reindex worker.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

use common::{items, Harness, MockQueryEngine, ITEMS, TENANT};
use search_reindexer::{
    BackendReindexParams, EntityConfig, EntityConfigRegistry, QueueDispatcher, ReindexWorker,
    WorkerConfig,
};
use search_reindexer_repository::{InMemoryJobQueue, JobQueue};
use search_reindexer_shared::{BackendKind, RecordRef};

fn items_only() -> EntityConfigRegistry {
    EntityConfigRegistry::from_entities(vec![EntityConfig::new(ITEMS)])
}

#[tokio::test]
async fn test_worker_drains_queued_sweep_into_its_backend_only() {
    let harness = Harness::new(
        items_only(),
        MockQueryEngine::new().with_records(ITEMS, items(25, &[])),
    );
    let result = harness
        .indexer
        .reindex_entity_to_vector(
            ITEMS,
            &BackendReindexParams::new(TENANT).with_queue(true).with_page_size(10),
        )
        .await
        .unwrap();
    assert_eq!(result.jobs_enqueued, 3);

    let dispatched = harness
        .lock_manager
        .status(BackendKind::Vector, TENANT)
        .await
        .unwrap()
        .expect("lock handed to workers");
    assert_eq!(dispatched.lock.processed_count, 0);
    assert_eq!(dispatched.lock.total_count, 25);

    let worker = ReindexWorker::new(
        harness.indexer.clone(),
        harness.vector_queue.clone(),
        BackendKind::Vector,
    )
    .with_lock_manager(harness.lock_manager.clone());

    let stats = worker.drain().await;

    assert_eq!(stats.jobs_completed, 3);
    assert_eq!(stats.jobs_failed, 0);
    assert_eq!(stats.records_indexed, 25);
    assert_eq!(harness.vector.records().await.len(), 25);
    assert!(harness.fulltext.records().await.is_empty());
    assert_eq!(harness.vector_queue.pending_len().await, 0);
    assert_eq!(harness.vector_queue.leased_len().await, 0);

    let status = harness
        .lock_manager
        .status(BackendKind::Vector, TENANT)
        .await
        .unwrap()
        .expect("workers keep the lock alive");
    assert_eq!(status.lock.processed_count, 25);
    assert_eq!(status.lock.total_count, 25);
}

#[tokio::test]
async fn test_worker_skips_records_deleted_since_dispatch() {
    let harness = Harness::new(
        items_only(),
        MockQueryEngine::new().with_records(ITEMS, items(2, &[])),
    );
    QueueDispatcher::new()
        .with_fulltext_queue(harness.fulltext_queue.clone())
        .dispatch(
            BackendKind::Fulltext,
            TENANT,
            None,
            vec![
                RecordRef::new(ITEMS, "item-0"),
                RecordRef::new(ITEMS, "item-gone"),
                RecordRef::new("catalog:unknown", "x"),
            ],
        )
        .await
        .unwrap();

    let worker = ReindexWorker::new(
        harness.indexer.clone(),
        harness.fulltext_queue.clone(),
        BackendKind::Fulltext,
    );
    let stats = worker.drain().await;

    assert_eq!(stats.jobs_completed, 1);
    assert_eq!(stats.records_indexed, 1);
    assert_eq!(stats.records_skipped, 2);
    assert_eq!(harness.fulltext.record_ids().await, vec!["item-0".to_string()]);
}

#[tokio::test]
async fn test_failing_job_is_retried_then_dead_lettered() {
    let harness = Harness::new(
        items_only(),
        MockQueryEngine::new()
            .with_records(ITEMS, items(1, &[]))
            .failing_on_page(1),
    );
    let queue = Arc::new(InMemoryJobQueue::with_max_attempts("vector-indexing", 2));
    QueueDispatcher::new()
        .with_vector_queue(queue.clone())
        .dispatch(BackendKind::Vector, TENANT, None, vec![RecordRef::new(ITEMS, "item-0")])
        .await
        .unwrap();

    let worker = ReindexWorker::new(harness.indexer.clone(), queue.clone(), BackendKind::Vector);
    let stats = worker.drain().await;

    assert_eq!(stats.jobs_failed, 2);
    assert_eq!(stats.jobs_completed, 0);
    let dead = queue.dead_letters().await;
    assert_eq!(dead.len(), 1);
    assert!(dead[0].1.contains("item-0"));
}

#[tokio::test]
async fn test_worker_run_stops_on_shutdown() {
    let harness = Harness::new(
        items_only(),
        MockQueryEngine::new().with_records(ITEMS, items(40, &[])),
    );
    let worker = Arc::new(
        ReindexWorker::new(
            harness.indexer.clone(),
            harness.fulltext_queue.clone(),
            BackendKind::Fulltext,
        )
        .with_config(WorkerConfig {
            concurrency: 2,
            poll_interval: Duration::from_millis(10),
            progress_log_interval: Duration::from_millis(50),
        }),
    );
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(worker.clone().run(shutdown_rx));

    let result = harness
        .indexer
        .reindex_entity_to_fulltext(
            ITEMS,
            &BackendReindexParams::new(TENANT).with_queue(true).with_page_size(10),
        )
        .await
        .unwrap();
    assert_eq!(result.jobs_enqueued, 4);

    timeout(Duration::from_secs(5), async {
        while worker.stats().jobs_completed < 4 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("worker should finish all jobs");

    shutdown_tx.send(()).unwrap();
    let stats = timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker should stop")
        .unwrap();

    assert_eq!(stats.jobs_completed, 4);
    assert_eq!(stats.records_indexed, 40);
    assert_eq!(harness.fulltext.records().await.len(), 40);
    assert_eq!(harness.fulltext_queue.name(), "fulltext-indexing");
}
