//! Adapter registry: pure id → adapter mapping, populated once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use super::{AzylAdapter, PromykAdapter, ShelterAdapter};
use crate::model::Shelter;

/// Id + display name, for the CLI `list` surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub id: String,
    pub name: String,
}

/// Lookup of adapters by stable shelter id. No runtime mutation after
/// initialization.
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ShelterAdapter>>,
}

impl AdapterRegistry {
    /// Empty registry; register adapters before use.
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry with every production adapter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PromykAdapter::new(PromykAdapter::default_config())));
        registry.register(Arc::new(AzylAdapter::new(AzylAdapter::default_config())));
        registry
    }

    /// Register one adapter under its configured id.
    pub fn register(&mut self, adapter: Arc<dyn ShelterAdapter>) {
        self.adapters.insert(adapter.config().id.clone(), adapter);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ShelterAdapter>> {
        self.adapters.get(id).cloned()
    }

    pub fn get_all(&self) -> Vec<Arc<dyn ShelterAdapter>> {
        let mut adapters: Vec<_> = self.adapters.values().cloned().collect();
        adapters.sort_by(|a, b| a.config().id.cmp(&b.config().id));
        adapters
    }

    /// Id + name only, sorted by id.
    pub fn list(&self) -> Vec<AdapterInfo> {
        let mut infos: Vec<AdapterInfo> = self
            .adapters
            .values()
            .map(|adapter| AdapterInfo {
                id: adapter.config().id.clone(),
                name: adapter.config().name.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Shelter records for every registered adapter, for seeding an empty
    /// store.
    pub fn shelters(&self) -> Vec<Shelter> {
        self.get_all()
            .into_iter()
            .map(|adapter| adapter.config().to_shelter())
            .collect()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
