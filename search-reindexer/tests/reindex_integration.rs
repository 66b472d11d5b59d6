//! Integration tests for reindex sweeps and single-record operations.
//!
//! These tests run the real indexer, lock manager and coverage tracker over
//! in-memory stores, a scripted record store and recording strategies.

mod common;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use common::{
    fields, item, items, Harness, MockQueryEngine, RecordingStrategy, CATEGORIES, ITEMS, TENANT,
};
use search_reindexer::{
    BackendReindexParams, DeleteRecordParams, EntityConfig, EntityConfigRegistry, HookContext, HookError,
    IndexByIdParams, IndexOutcome, IndexRecordParams, IndexerConfig, ModuleConfig,
    PurgeEntityParams, ReindexParams, SkipReason, SourceContribution,
};
use search_reindexer_repository::{PageRequest, QueryEngine, QueryOptions};
use search_reindexer_shared::{
    BackendKind, CoverageCount, Presenter, ReindexPhase, ReindexProgress,
};

fn catalog() -> EntityConfigRegistry {
    EntityConfigRegistry::register([ModuleConfig::new(
        "catalog",
        vec![EntityConfig::new(ITEMS), EntityConfig::new(CATEGORIES)],
    )])
}

fn items_only() -> EntityConfigRegistry {
    EntityConfigRegistry::from_entities(vec![EntityConfig::new(ITEMS)])
}

async fn coverage_of(
    harness: &Harness,
    backend: BackendKind,
    organization_id: Option<&str>,
) -> Option<u64> {
    harness
        .coverage
        .get_count(backend, ITEMS, TENANT, organization_id)
        .await
        .unwrap()
        .map(|count| count.indexed_count)
}

#[tokio::test]
async fn test_fulltext_sweep_pages_through_entity_and_drops_records_without_id() {
    let engine = MockQueryEngine::new().with_records(ITEMS, items(453, &[10, 250, 400]));
    let harness = Harness::new(items_only(), engine);

    let progress: Arc<Mutex<Vec<ReindexProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = progress.clone();
    let params = BackendReindexParams::new(TENANT)
        .with_progress(Arc::new(move |p: ReindexProgress| sink.lock().unwrap().push(p)));

    let result = harness
        .indexer
        .reindex_entity_to_fulltext(ITEMS, &params)
        .await
        .unwrap();

    assert!(result.success, "unexpected errors: {:?}", result.errors);
    assert_eq!(result.entities_processed, 1);
    assert_eq!(result.records_indexed, 450);
    assert_eq!(result.records_dropped, 3);
    assert_eq!(harness.engine.calls(), 3);
    assert_eq!(harness.fulltext.bulk_calls(), 3);
    assert_eq!(harness.fulltext.records().await.len(), 450);
    assert!(harness.vector.records().await.is_empty());
    assert_eq!(harness.indexer.dropped_records(), 3);

    assert_eq!(coverage_of(&harness, BackendKind::Fulltext, None).await, Some(450));
    assert!(harness
        .indexer
        .get_reindex_lock_status(BackendKind::Fulltext, TENANT)
        .await
        .unwrap()
        .is_none());

    let progress = progress.lock().unwrap();
    assert_eq!(progress.first().map(|p| p.phase), Some(ReindexPhase::Starting));
    let last = progress.last().unwrap();
    assert_eq!(last.phase, ReindexPhase::Complete);
    assert_eq!(last.processed, 453);
    assert_eq!(last.total, Some(453));
}

#[tokio::test]
async fn test_hook_failure_keeps_record_and_other_contributions() {
    let registry = EntityConfigRegistry::from_entities(vec![EntityConfig::new(ITEMS)
        .with_build_source(|ctx: HookContext| async move {
            if ctx.record_id == "item-3" {
                return Err(HookError::failed("template missing"));
            }
            let name = ctx.str_field("name").unwrap_or_default().to_string();
            Ok(Some(SourceContribution::text(name.clone()).with_presenter(Presenter::new(name))))
        })
        .with_format_result(|ctx: HookContext| async move {
            Ok(Some(Presenter::new(format!("Fallback {}", ctx.record_id))))
        })
        .with_resolve_url(|ctx: HookContext| async move {
            Ok(Some(format!("/catalog/items/{}", ctx.record_id)))
        })]);
    let harness = Harness::new(registry, MockQueryEngine::new().with_records(ITEMS, items(5, &[])));

    let result = harness
        .indexer
        .reindex_entity(ITEMS, &ReindexParams::new(TENANT))
        .await;

    assert!(result.success);
    assert_eq!(result.records_indexed, 5);

    let records = harness.fulltext.records().await;
    assert_eq!(records.len(), 5);
    let failed = records.iter().find(|r| r.record_id == "item-3").unwrap();
    assert!(failed.text.is_none());
    assert_eq!(failed.presenter.as_ref().unwrap().title, "Fallback item-3");
    assert_eq!(failed.url.as_deref(), Some("/catalog/items/item-3"));

    let healthy = records.iter().find(|r| r.record_id == "item-1").unwrap();
    assert_eq!(healthy.presenter.as_ref().unwrap().title, "Item item-1");
    assert!(healthy.text.is_some());
    assert_eq!(harness.vector.records().await.len(), 5);
}

#[tokio::test]
async fn test_hooks_read_through_engine_that_never_triggers_reindex() {
    let registry = EntityConfigRegistry::from_entities(vec![EntityConfig::new(ITEMS)
        .with_build_source(|ctx: HookContext| async move {
            let mut options =
                QueryOptions::page(ctx.tenant_id.clone(), None, PageRequest::new(1, 1));
            options.skip_auto_reindex = false;
            let page = ctx.query_engine.query(CATEGORIES, options).await?;
            Ok::<_, HookError>(Some(SourceContribution::text(format!(
                "{} categories",
                page.total
            ))))
        })]);
    let engine = MockQueryEngine::new()
        .with_records(ITEMS, items(3, &[]))
        .with_records(CATEGORIES, vec![item("cat-1")]);
    let harness = Harness::new(registry, engine);

    let result = harness
        .indexer
        .reindex_entity_to_fulltext(ITEMS, &BackendReindexParams::new(TENANT))
        .await
        .unwrap();

    assert_eq!(result.records_indexed, 3);
    let flags = harness.engine.skip_flags().await;
    assert_eq!(flags.len(), 4);
    assert!(flags.iter().all(|skip| *skip));
}

#[tokio::test]
async fn test_purge_resets_coverage_of_every_scope() {
    let harness = Harness::new(items_only(), MockQueryEngine::new());
    harness
        .coverage
        .write_coverage_counts(&[
            CoverageCount::new(BackendKind::Fulltext, ITEMS, TENANT, None, 10),
            CoverageCount::new(BackendKind::Fulltext, ITEMS, TENANT, Some("org-a".to_string()), 4),
            CoverageCount::new(BackendKind::Vector, ITEMS, TENANT, Some("org-b".to_string()), 2),
        ])
        .await
        .unwrap();

    harness
        .indexer
        .purge_entity(&PurgeEntityParams::new(ITEMS, TENANT))
        .await
        .unwrap();

    assert_eq!(harness.fulltext.purged().await, vec![ITEMS.to_string()]);
    assert_eq!(harness.vector.purged().await, vec![ITEMS.to_string()]);
    assert_eq!(coverage_of(&harness, BackendKind::Fulltext, None).await, Some(0));
    assert_eq!(coverage_of(&harness, BackendKind::Fulltext, Some("org-a")).await, Some(0));
    assert_eq!(coverage_of(&harness, BackendKind::Vector, Some("org-b")).await, Some(0));
    assert_eq!(coverage_of(&harness, BackendKind::Vector, None).await, Some(0));
}

#[tokio::test]
async fn test_purge_of_unconfigured_entity_is_an_error() {
    let harness = Harness::new(items_only(), MockQueryEngine::new());

    let err = harness
        .indexer
        .purge_entity(&PurgeEntityParams::new("catalog:unknown", TENANT))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("catalog:unknown"));
    assert!(harness.fulltext.purged().await.is_empty());
}

#[tokio::test]
async fn test_delete_record_removes_from_every_backend() {
    let harness = Harness::new(
        items_only(),
        MockQueryEngine::new().with_records(ITEMS, items(3, &[])),
    );
    harness
        .indexer
        .reindex_entity(ITEMS, &ReindexParams::new(TENANT))
        .await;

    harness
        .indexer
        .delete_record(&DeleteRecordParams::new(ITEMS, "item-1", TENANT))
        .await
        .unwrap();

    assert_eq!(harness.fulltext.records().await.len(), 2);
    assert_eq!(harness.vector.records().await.len(), 2);
    assert!(!harness.vector.record_ids().await.contains(&"item-1".to_string()));

    let unknown = harness
        .indexer
        .delete_record(&DeleteRecordParams::new(CATEGORIES, "cat-1", TENANT))
        .await;
    assert!(unknown.is_err());
}

#[tokio::test]
async fn test_held_lock_is_reported_before_any_record_is_read() {
    let harness = Harness::new(items_only(), MockQueryEngine::new().with_records(ITEMS, items(5, &[])));
    let held = harness
        .indexer
        .acquire_reindex_lock(BackendKind::Vector, "reindex:manual", TENANT, Some("org-a"))
        .await
        .unwrap();

    let err = harness
        .indexer
        .reindex_entity_to_vector(ITEMS, &BackendReindexParams::new(TENANT))
        .await
        .unwrap_err();

    let conflict = err.as_lock_conflict().expect("lock conflict");
    assert_eq!(conflict.lock.action, "reindex:manual");
    assert_eq!(conflict.lock.organization_id.as_deref(), Some("org-a"));
    assert!(conflict.elapsed >= chrono::Duration::zero());
    assert_eq!(harness.engine.calls(), 0);
    assert!(harness.vector.records().await.is_empty());

    // A full-text sweep of the same tenant is not excluded.
    let fulltext = harness
        .indexer
        .reindex_entity_to_fulltext(ITEMS, &BackendReindexParams::new(TENANT))
        .await
        .unwrap();
    assert_eq!(fulltext.records_indexed, 5);

    held.release().await.unwrap();
    let retried = harness
        .indexer
        .reindex_entity_to_vector(ITEMS, &BackendReindexParams::new(TENANT))
        .await
        .unwrap();
    assert_eq!(retried.records_indexed, 5);
}

#[tokio::test]
async fn test_concurrent_vector_sweeps_are_mutually_exclusive() {
    let engine = MockQueryEngine::new()
        .with_records(ITEMS, items(30, &[]))
        .with_latency(Duration::from_millis(20));
    let harness = Harness::new(items_only(), engine);
    let params = BackendReindexParams::new(TENANT).with_page_size(10);

    let (first, second) = tokio::join!(
        harness.indexer.reindex_entity_to_vector(ITEMS, &params),
        harness.indexer.reindex_entity_to_vector(ITEMS, &params),
    );

    let outcomes = [first, second];
    let winners: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
    let conflicts = outcomes
        .iter()
        .filter(|o| matches!(o, Err(e) if e.as_lock_conflict().is_some()))
        .count();

    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, 1);
    assert_eq!(winners[0].records_indexed, 30);
    assert_eq!(harness.vector.records().await.len(), 30);
}

#[tokio::test]
async fn test_sweep_stops_at_page_ceiling() {
    let engine = MockQueryEngine::new()
        .with_records(ITEMS, items(1000, &[]))
        .without_total();
    let harness = Harness::new(items_only(), engine).with_indexer_config(IndexerConfig {
        page_size: 10,
        max_pages: 5,
        ..IndexerConfig::default()
    });

    let result = harness
        .indexer
        .reindex_entity_to_fulltext(ITEMS, &BackendReindexParams::new(TENANT))
        .await
        .unwrap();

    assert_eq!(harness.engine.calls(), 5);
    assert_eq!(result.records_indexed, 50);
    assert_eq!(coverage_of(&harness, BackendKind::Fulltext, None).await, None);
}

#[tokio::test]
async fn test_query_failure_aborts_sweep_and_releases_lock() {
    let engine = MockQueryEngine::new()
        .with_records(ITEMS, items(450, &[]))
        .failing_on_page(2);
    let harness = Harness::new(items_only(), engine);

    let result = harness
        .indexer
        .reindex_entity_to_fulltext(ITEMS, &BackendReindexParams::new(TENANT))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.records_indexed, 200);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].error.contains("page 2"));
    assert_eq!(harness.engine.calls(), 2);
    assert_eq!(coverage_of(&harness, BackendKind::Fulltext, None).await, None);
    assert!(harness
        .lock_manager
        .status(BackendKind::Fulltext, TENANT)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_failed_fulltext_batch_continues_with_next_page() {
    let harness = Harness::with_strategies(
        items_only(),
        MockQueryEngine::new().with_records(ITEMS, items(450, &[])),
        RecordingStrategy::new("fulltext").failing_bulk_call(2),
        RecordingStrategy::new("vector"),
    );

    let result = harness
        .indexer
        .reindex_entity_to_fulltext(ITEMS, &BackendReindexParams::new(TENANT))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(harness.fulltext.bulk_calls(), 3);
    assert_eq!(result.records_indexed, 250);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].error.contains("page 2"));
    assert_eq!(coverage_of(&harness, BackendKind::Fulltext, None).await, None);
}

#[tokio::test]
async fn test_failed_vector_record_continues_with_next_record() {
    let harness = Harness::with_strategies(
        items_only(),
        MockQueryEngine::new().with_records(ITEMS, items(20, &[])),
        RecordingStrategy::new("fulltext"),
        RecordingStrategy::new("vector").failing_records(&["item-5", "item-7"]),
    );

    let result = harness
        .indexer
        .reindex_entity_to_vector(ITEMS, &BackendReindexParams::new(TENANT).with_page_size(8))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.records_indexed, 18);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().all(|e| e.entity_id == ITEMS));
    assert_eq!(harness.vector.records().await.len(), 18);
}

#[tokio::test]
async fn test_unavailable_backend_fails_softly() {
    let harness = Harness::with_strategies(
        items_only(),
        MockQueryEngine::new().with_records(ITEMS, items(3, &[])),
        RecordingStrategy::new("fulltext").unavailable(),
        RecordingStrategy::new("vector"),
    );

    let result = harness
        .indexer
        .reindex_entity_to_fulltext(ITEMS, &BackendReindexParams::new(TENANT))
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.errors[0].error.contains("fulltext"));
    assert_eq!(harness.engine.calls(), 0);
}

#[tokio::test]
async fn test_unconfigured_entity_fails_softly() {
    let registry = EntityConfigRegistry::from_entities(vec![
        EntityConfig::new(ITEMS),
        EntityConfig::new(CATEGORIES).with_enabled(false),
    ]);
    let harness = Harness::new(registry, MockQueryEngine::new());

    let result = harness
        .indexer
        .reindex_entity_to_vector(CATEGORIES, &BackendReindexParams::new(TENANT))
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.errors[0].entity_id, CATEGORIES);
    assert!(result.errors[0].error.contains("not configured"));

    let general = harness
        .indexer
        .reindex_entity(CATEGORIES, &ReindexParams::new(TENANT))
        .await;
    assert!(!general.success);
    assert_eq!(harness.engine.calls(), 0);
}

#[tokio::test]
async fn test_queue_mode_hands_lock_to_workers() {
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

    assert!(result.success);
    assert_eq!(result.jobs_enqueued, 3);
    assert_eq!(result.records_indexed, 0);
    assert_eq!(harness.vector_queue.pending_len().await, 3);
    assert!(harness.vector.records().await.is_empty());
    assert_eq!(coverage_of(&harness, BackendKind::Vector, None).await, None);

    let status = harness
        .lock_manager
        .status(BackendKind::Vector, TENANT)
        .await
        .unwrap()
        .expect("lock handed to workers");
    assert!(status.is_active());
    assert_eq!(status.lock.total_count, 25);
    assert_eq!(status.lock.processed_count, 0);
}

#[tokio::test]
async fn test_queue_mode_without_jobs_releases_lock() {
    let harness = Harness::new(items_only(), MockQueryEngine::new());

    let result = harness
        .indexer
        .reindex_entity_to_fulltext(ITEMS, &BackendReindexParams::new(TENANT).with_queue(true))
        .await
        .unwrap();

    assert_eq!(result.jobs_enqueued, 0);
    assert!(harness
        .lock_manager
        .status(BackendKind::Fulltext, TENANT)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_purge_first_makes_vector_reindex_idempotent() {
    let harness = Harness::new(
        items_only(),
        MockQueryEngine::new().with_records(ITEMS, items(12, &[])),
    );
    let params = BackendReindexParams::new(TENANT).with_purge_first(true);

    let first = harness
        .indexer
        .reindex_entity_to_vector(ITEMS, &params)
        .await
        .unwrap();
    let second = harness
        .indexer
        .reindex_entity_to_vector(ITEMS, &params)
        .await
        .unwrap();

    assert_eq!(first.records_indexed, 12);
    assert_eq!(second.records_indexed, 12);
    assert_eq!(harness.vector.purged().await.len(), 2);
    assert_eq!(harness.vector.records().await.len(), 12);
    assert_eq!(coverage_of(&harness, BackendKind::Vector, None).await, Some(12));
}

#[tokio::test]
async fn test_recreate_index_resets_fulltext_coverage() {
    let engine = MockQueryEngine::new()
        .with_records(ITEMS, items(4, &[]))
        .with_records(CATEGORIES, vec![item("cat-1"), item("cat-2")]);
    let harness = Harness::new(catalog(), engine);
    harness
        .coverage
        .write_count(BackendKind::Fulltext, CATEGORIES, TENANT, Some("org-a"), 9)
        .await
        .unwrap();

    let result = harness
        .indexer
        .reindex_entity_to_fulltext(ITEMS, &BackendReindexParams::new(TENANT).with_recreate_index(true))
        .await
        .unwrap();

    assert_eq!(harness.fulltext.recreated(), 1);
    assert_eq!(result.records_indexed, 4);
    assert_eq!(coverage_of(&harness, BackendKind::Fulltext, None).await, Some(4));
    let categories = harness
        .coverage
        .get_count(BackendKind::Fulltext, CATEGORIES, TENANT, Some("org-a"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(categories.indexed_count, 0);
}

#[tokio::test]
async fn test_reindex_all_to_vector_covers_every_enabled_entity() {
    let engine = MockQueryEngine::new()
        .with_records(ITEMS, items(7, &[]))
        .with_records(CATEGORIES, vec![item("cat-1"), item("cat-2")]);
    let harness = Harness::new(catalog(), engine);

    let result = harness
        .indexer
        .reindex_all_to_vector(&BackendReindexParams::new(TENANT).with_purge_first(true))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.entities_processed, 2);
    assert_eq!(result.records_indexed, 9);
    assert_eq!(
        harness.vector.purged().await,
        vec![ITEMS.to_string(), CATEGORIES.to_string()]
    );
}

#[tokio::test]
async fn test_reindex_all_through_facade_with_purge() {
    let engine = MockQueryEngine::new()
        .with_records(ITEMS, items(3, &[]))
        .with_records(CATEGORIES, vec![item("cat-1")]);
    let harness = Harness::new(catalog(), engine);

    let params = ReindexParams::new(TENANT).with_purge_first(true);
    harness.indexer.reindex_all(&params).await;
    let result = harness.indexer.reindex_all(&params).await;

    assert!(result.success);
    assert_eq!(result.entities_processed, 2);
    assert_eq!(result.records_indexed, 4);
    assert_eq!(harness.fulltext.records().await.len(), 4);
    assert_eq!(harness.vector.records().await.len(), 4);
}

#[tokio::test]
async fn test_partitioned_sweep_indexes_every_record_once() {
    let records = items(300, &[42]);
    let harness = Harness::new(
        items_only(),
        MockQueryEngine::new().with_records(ITEMS, records.clone()),
    );

    let result = harness
        .indexer
        .reindex_entity_partitioned(
            BackendKind::Vector,
            ITEMS,
            &BackendReindexParams::new(TENANT).with_page_size(16).with_purge_first(true),
            4,
            |_| Arc::new(MockQueryEngine::new().with_records(ITEMS, records.clone())) as Arc<dyn QueryEngine>,
        )
        .await
        .unwrap();

    assert!(result.success, "unexpected errors: {:?}", result.errors);
    assert_eq!(result.entities_processed, 1);
    assert_eq!(result.records_indexed, 299);
    assert_eq!(result.records_dropped, 1);

    let ids: HashSet<String> = harness.vector.record_ids().await.into_iter().collect();
    assert_eq!(ids.len(), 299);
    assert_eq!(harness.vector.purged().await.len(), 1);
    assert_eq!(coverage_of(&harness, BackendKind::Vector, None).await, Some(299));
    assert!(harness
        .lock_manager
        .status(BackendKind::Vector, TENANT)
        .await
        .unwrap()
        .is_none());
    // The indexer's own engine is never used by partitions.
    assert_eq!(harness.engine.calls(), 0);
}

#[tokio::test]
async fn test_index_record_by_id_outcomes() {
    let harness = Harness::new(
        items_only(),
        MockQueryEngine::new().with_records(ITEMS, items(5, &[])),
    );

    let unknown = harness
        .indexer
        .index_record_by_id(&IndexByIdParams::new("catalog:unknown", "x", TENANT))
        .await
        .unwrap();
    assert_eq!(unknown, IndexOutcome::Skipped(SkipReason::EntityNotConfigured));

    let missing = harness
        .indexer
        .index_record_by_id(&IndexByIdParams::new(ITEMS, "item-99", TENANT))
        .await
        .unwrap();
    assert_eq!(missing, IndexOutcome::Skipped(SkipReason::RecordNotFound));

    let indexed = harness
        .indexer
        .index_record_by_id(
            &IndexByIdParams::new(ITEMS, "item-2", TENANT).for_backend(Some(BackendKind::Fulltext)),
        )
        .await
        .unwrap();
    assert!(indexed.is_indexed());
    assert_eq!(harness.fulltext.record_ids().await, vec!["item-2".to_string()]);
    assert!(harness.vector.records().await.is_empty());
}

#[tokio::test]
async fn test_index_record_merges_custom_fields() {
    let harness = Harness::new(items_only(), MockQueryEngine::new());
    let record = fields(json!({ "id": "item-1", "name": "Chair", "cf:color": "red" }));

    let outcome = harness
        .indexer
        .index_record(
            &IndexRecordParams::new(ITEMS, TENANT, record)
                .with_organization(Some("org-a".to_string()))
                .with_custom_fields(fields(json!({ "name": "ignored", "size": 3 }))),
        )
        .await
        .unwrap();
    assert!(outcome.is_indexed());

    let stored = harness.fulltext.records().await.remove(0);
    assert_eq!(stored.organization_id.as_deref(), Some("org-a"));
    assert_eq!(stored.fields["name"], json!("Chair"));
    assert_eq!(stored.fields["color"], json!("red"));
    assert_eq!(stored.fields["size"], json!(3));

    let no_id = harness
        .indexer
        .index_record(&IndexRecordParams::new(ITEMS, TENANT, fields(json!({ "name": "n" }))))
        .await
        .unwrap();
    assert_eq!(no_id, IndexOutcome::Skipped(SkipReason::MissingIdentifier));
}

#[tokio::test]
async fn test_bulk_index_records_leaves_out_unusable_inputs() {
    let registry = EntityConfigRegistry::from_entities(vec![EntityConfig::new(ITEMS)
        .with_build_source(|_ctx: HookContext| async move {
            Ok(Some(SourceContribution::text("never used in bulk".to_string())))
        })
        .with_format_result(|ctx: HookContext| async move {
            if ctx.record_id == "item-2" {
                return Err(HookError::failed("presenter unavailable"));
            }
            Ok(Some(Presenter::new(ctx.record_id.clone())))
        })]);
    let harness = Harness::new(registry, MockQueryEngine::new());

    let inputs = vec![
        IndexRecordParams::new(ITEMS, TENANT, item("item-1")),
        IndexRecordParams::new(ITEMS, TENANT, item("item-2")),
        IndexRecordParams::new("catalog:unknown", TENANT, item("item-3")),
        IndexRecordParams::new(ITEMS, TENANT, fields(json!({ "name": "no id" }))),
    ];

    let summary = harness.indexer.bulk_index_records(&inputs).await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(harness.fulltext.bulk_calls(), 1);

    let records = harness.fulltext.records().await;
    assert!(records.iter().all(|r| r.text.is_none()));
    let first = records.iter().find(|r| r.record_id == "item-1").unwrap();
    assert_eq!(first.presenter.as_ref().unwrap().title, "item-1");
    let second = records.iter().find(|r| r.record_id == "item-2").unwrap();
    assert!(second.presenter.is_none());

    let empty = harness.indexer.bulk_index_records(&[]).await.unwrap();
    assert_eq!(empty.total, 0);
}
