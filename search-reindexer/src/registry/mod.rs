//! Entity configuration registry.
//!
//! The registry is built once from module-supplied configuration and is
//! read-only afterwards. Disabled entities are not stored, so every indexing
//! path treats "unknown" and "disabled" the same way.

mod hooks;

pub use hooks::{EntityHooks, Hook, HookContext, HookFuture, SourceContribution};

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use tracing::{debug, warn};

use crate::errors::HookError;
use hooks::boxed_hook;
use search_reindexer_shared::{Presenter, RecordLink};

/// Indexing configuration of one entity type.
#[derive(Clone)]
pub struct EntityConfig {
    pub entity_id: String,
    pub enabled: bool,
    pub hooks: EntityHooks,
}

impl fmt::Debug for EntityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityConfig")
            .field("entity_id", &self.entity_id)
            .field("enabled", &self.enabled)
            .field("build_source", &self.hooks.build_source.is_some())
            .field("format_result", &self.hooks.format_result.is_some())
            .field("resolve_url", &self.hooks.resolve_url.is_some())
            .field("resolve_links", &self.hooks.resolve_links.is_some())
            .finish()
    }
}

impl EntityConfig {
    /// An enabled entity with no hooks.
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            enabled: true,
            hooks: EntityHooks::default(),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_build_source<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<SourceContribution>, HookError>> + Send + 'static,
    {
        self.hooks.build_source = Some(boxed_hook(hook));
        self
    }

    pub fn with_format_result<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Presenter>, HookError>> + Send + 'static,
    {
        self.hooks.format_result = Some(boxed_hook(hook));
        self
    }

    pub fn with_resolve_url<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<String>, HookError>> + Send + 'static,
    {
        self.hooks.resolve_url = Some(boxed_hook(hook));
        self
    }

    pub fn with_resolve_links<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Vec<RecordLink>>, HookError>> + Send + 'static,
    {
        self.hooks.resolve_links = Some(boxed_hook(hook));
        self
    }
}

/// The entity configurations contributed by one module.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    pub module_id: String,
    pub entities: Vec<EntityConfig>,
}

impl ModuleConfig {
    pub fn new(module_id: impl Into<String>, entities: Vec<EntityConfig>) -> Self {
        Self {
            module_id: module_id.into(),
            entities,
        }
    }
}

/// Immutable map from entity identifier to its enabled configuration.
#[derive(Debug, Clone, Default)]
pub struct EntityConfigRegistry {
    entries: HashMap<String, EntityConfig>,
    /// Registration order of the enabled entities.
    order: Vec<String>,
}

impl EntityConfigRegistry {
    /// Build the registry from module configurations.
    ///
    /// Disabled entities are left out. When two modules declare the same
    /// entity the later declaration wins.
    pub fn register(modules: impl IntoIterator<Item = ModuleConfig>) -> Self {
        let mut registry = Self::default();

        for module in modules {
            for config in module.entities {
                if !config.enabled {
                    debug!(
                        module_id = %module.module_id,
                        entity_id = %config.entity_id,
                        "Skipping disabled entity"
                    );
                    registry.remove(&config.entity_id);
                    continue;
                }

                if registry.entries.contains_key(&config.entity_id) {
                    warn!(
                        module_id = %module.module_id,
                        entity_id = %config.entity_id,
                        "Entity declared twice, keeping the later declaration"
                    );
                } else {
                    registry.order.push(config.entity_id.clone());
                }
                registry.entries.insert(config.entity_id.clone(), config);
            }
        }

        registry
    }

    /// Build a registry from entities of a single anonymous module.
    pub fn from_entities(entities: Vec<EntityConfig>) -> Self {
        Self::register([ModuleConfig::new("default", entities)])
    }

    fn remove(&mut self, entity_id: &str) {
        if self.entries.remove(entity_id).is_some() {
            self.order.retain(|id| id != entity_id);
        }
    }

    pub fn get(&self, entity_id: &str) -> Option<&EntityConfig> {
        self.entries.get(entity_id)
    }

    /// Enabled entities in registration order.
    pub fn list_enabled(&self) -> Vec<&EntityConfig> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .collect()
    }

    pub fn is_enabled(&self, entity_id: &str) -> bool {
        self.entries.contains_key(entity_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
