//! Translation of raw domain records into [`IndexableRecord`]s.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use super::SearchIndexer;
use crate::query::NoReindexQueryEngine;
use crate::registry::{EntityConfig, Hook, HookContext};
use search_reindexer_repository::QueryEngine;
use search_reindexer_shared::{IndexableRecord, RecordFields};

/// Tenant and organization a record is built for.
#[derive(Debug, Clone, Copy)]
pub struct RecordScope<'a> {
    pub tenant_id: &'a str,
    pub organization_id: Option<&'a str>,
}

impl<'a> RecordScope<'a> {
    pub fn new(tenant_id: &'a str, organization_id: Option<&'a str>) -> Self {
        Self {
            tenant_id,
            organization_id,
        }
    }
}

/// How much of the hook set to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuildMode {
    /// Every hook, failures logged at warn.
    Full,
    /// Presenter, URL and links only, failures logged at debug.
    BestEffort,
}

/// The identifier of a record: the explicit one if non-empty, otherwise the
/// record's `id` field (string or number).
pub(crate) fn resolve_record_id(record: &RecordFields, explicit: Option<&str>) -> Option<String> {
    if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }

    match record.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}

/// Split a record into its base fields and its extension fields.
///
/// Keys starting with one of `prefixes` are extension fields; the prefix is
/// stripped to recover the logical key.
pub(crate) fn split_custom_fields(
    record: &RecordFields,
    prefixes: &[String],
) -> (RecordFields, RecordFields) {
    let mut base = RecordFields::new();
    let mut custom = RecordFields::new();

    for (key, value) in record {
        let stripped = prefixes
            .iter()
            .find_map(|prefix| key.strip_prefix(prefix.as_str()))
            .filter(|rest| !rest.is_empty());

        match stripped {
            Some(logical) => {
                custom.insert(logical.to_string(), value.clone());
            }
            None => {
                base.insert(key.clone(), value.clone());
            }
        }
    }

    (base, custom)
}

/// Base fields plus extension fields; a base field wins over an extension
/// field with the same logical key.
fn merge_fields(mut base: RecordFields, custom: &RecordFields) -> RecordFields {
    for (key, value) in custom {
        if !base.contains_key(key) {
            base.insert(key.clone(), value.clone());
        }
    }
    base
}

async fn run_hook<T>(
    hook: Option<&Hook<T>>,
    name: &'static str,
    ctx: &HookContext,
    mode: BuildMode,
) -> Option<T> {
    let hook = hook?;
    match hook(ctx.clone()).await {
        Ok(contribution) => contribution,
        Err(e) => {
            match mode {
                BuildMode::Full => warn!(
                    hook = name,
                    entity_id = %ctx.entity_id,
                    record_id = %ctx.record_id,
                    error = %e,
                    "Hook failed, continuing without its contribution"
                ),
                BuildMode::BestEffort => debug!(
                    hook = name,
                    entity_id = %ctx.entity_id,
                    record_id = %ctx.record_id,
                    error = %e,
                    "Hook failed during bulk indexing"
                ),
            }
            None
        }
    }
}

impl SearchIndexer {
    /// Build the backend-ready form of one raw record.
    ///
    /// Returns `None` and bumps the drop counter when the record has no
    /// resolvable identifier. Hook failures never fail the build.
    pub async fn build_indexable_record(
        &self,
        config: &EntityConfig,
        record: &RecordFields,
        record_id: Option<&str>,
        scope: RecordScope<'_>,
        extra_custom: Option<&RecordFields>,
    ) -> Option<IndexableRecord> {
        self.build_with(
            config,
            record,
            record_id,
            scope,
            extra_custom,
            &self.query_engine,
            BuildMode::Full,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn build_with(
        &self,
        config: &EntityConfig,
        record: &RecordFields,
        record_id: Option<&str>,
        scope: RecordScope<'_>,
        extra_custom: Option<&RecordFields>,
        engine: &Arc<dyn QueryEngine>,
        mode: BuildMode,
    ) -> Option<IndexableRecord> {
        let Some(record_id) = resolve_record_id(record, record_id) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(entity_id = %config.entity_id, "Dropping record without identifier");
            return None;
        };

        let (base, mut custom) = split_custom_fields(record, &self.config.custom_field_prefixes);
        if let Some(extra) = extra_custom {
            for (key, value) in extra {
                custom.insert(key.clone(), value.clone());
            }
        }
        let fields = merge_fields(base, &custom);

        let ctx = HookContext {
            entity_id: config.entity_id.clone(),
            record_id: record_id.clone(),
            tenant_id: scope.tenant_id.to_string(),
            organization_id: scope.organization_id.map(str::to_string),
            record: record.clone(),
            custom_fields: custom,
            query_engine: Arc::new(NoReindexQueryEngine::new(engine.clone())),
        };

        let mut indexable = IndexableRecord::new(
            &config.entity_id,
            record_id,
            scope.tenant_id,
            scope.organization_id.map(str::to_string),
            fields,
        );
        let hooks = &config.hooks;

        if mode == BuildMode::Full {
            if let Some(source) =
                run_hook(hooks.build_source.as_ref(), "build_source", &ctx, mode).await
            {
                indexable.text = source.text.filter(|text| !text.is_blank());
                indexable.presenter = source.presenter;
                indexable.links = source.links;
                indexable.checksum_source = source.checksum_source;
            }
        }

        if indexable.presenter.is_none() {
            indexable.presenter =
                run_hook(hooks.format_result.as_ref(), "format_result", &ctx, mode).await;
        }
        if indexable.url.is_none() {
            indexable.url = run_hook(hooks.resolve_url.as_ref(), "resolve_url", &ctx, mode).await;
        }
        if indexable.links.is_none() {
            indexable.links =
                run_hook(hooks.resolve_links.as_ref(), "resolve_links", &ctx, mode).await;
        }

        Some(indexable)
    }

    /// Build every record of a page, keeping fetch order.
    ///
    /// Returns the built records and the number of dropped items.
    pub(crate) async fn build_page(
        &self,
        config: &EntityConfig,
        items: &[RecordFields],
        scope: RecordScope<'_>,
        engine: &Arc<dyn QueryEngine>,
    ) -> (Vec<IndexableRecord>, usize) {
        let built = join_all(
            items
                .iter()
                .map(|item| self.build_with(config, item, None, scope, None, engine, BuildMode::Full)),
        )
        .await;

        let records: Vec<IndexableRecord> = built.into_iter().flatten().collect();
        let dropped = items.len() - records.len();
        (records, dropped)
    }
}
