//! Optional per-entity hooks and the context they receive.
//!
//! Each hook is an independently optional async function. The indexer calls
//! them through one wrapper that logs a failure and treats it as "no
//! contribution".

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::errors::HookError;
use search_reindexer_repository::QueryEngine;
use search_reindexer_shared::{Presenter, RecordFields, RecordLink, RecordText};

/// Boxed future returned by every hook.
pub type HookFuture<T> = BoxFuture<'static, Result<Option<T>, HookError>>;

/// A type-erased hook producing an optional `T`.
pub type Hook<T> = Arc<dyn Fn(HookContext) -> HookFuture<T> + Send + Sync>;

/// Everything a hook may look at while contributing to a record.
#[derive(Clone)]
pub struct HookContext {
    pub entity_id: String,
    pub record_id: String,
    pub tenant_id: String,
    pub organization_id: Option<String>,
    /// The raw record as returned by the record store.
    pub record: RecordFields,
    /// Extension fields with their prefix stripped.
    pub custom_fields: RecordFields,
    /// Query access for hooks. Queries issued through it never trigger
    /// automatic reindexing.
    pub query_engine: Arc<dyn QueryEngine>,
}

impl HookContext {
    /// Look up a field of the raw record, falling back to the custom fields.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.record.get(key).or_else(|| self.custom_fields.get(key))
    }

    /// Look up a string field of the raw record or the custom fields.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }
}

/// What `build_source` may contribute in a single call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceContribution {
    pub text: Option<RecordText>,
    pub presenter: Option<Presenter>,
    pub links: Option<Vec<RecordLink>>,
    pub checksum_source: Option<Value>,
}

impl SourceContribution {
    pub fn text(text: impl Into<RecordText>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_presenter(mut self, presenter: Presenter) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn with_links(mut self, links: Vec<RecordLink>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn with_checksum_source(mut self, checksum_source: Value) -> Self {
        self.checksum_source = Some(checksum_source);
        self
    }
}

/// The optional hook set of one entity.
#[derive(Clone, Default)]
pub struct EntityHooks {
    pub build_source: Option<Hook<SourceContribution>>,
    pub format_result: Option<Hook<Presenter>>,
    pub resolve_url: Option<Hook<String>>,
    pub resolve_links: Option<Hook<Vec<RecordLink>>>,
}

pub(crate) fn boxed_hook<T, F, Fut>(hook: F) -> Hook<T>
where
    T: Send + 'static,
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<T>, HookError>> + Send + 'static,
{
    Arc::new(move |ctx| hook(ctx).boxed())
}
