//! Catalog - collections and model types registered by name
//!
//! Relation declarations often need a collection that is defined later in
//! startup, or two model types reference each other's collections. A catalog
//! hands out deferred references by name that resolve once the collection is
//! registered.

use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::collection::{lazy_collection, Collection, CollectionFn};
use crate::error::{ModelError, ModelResult};
use crate::model::ModelType;

/// Named collections and model types
#[derive(Default)]
pub struct Catalog {
    collections: DashMap<String, Arc<dyn Collection>>,
    models: DashMap<String, Arc<ModelType>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection under its own name, replacing any previous one
    pub fn register_collection(&self, collection: Arc<dyn Collection>) {
        let name = collection.name().to_string();
        if self.collections.insert(name.clone(), collection).is_some() {
            tracing::warn!("Collection '{}' was registered twice, keeping the latest", name);
        }
    }

    pub fn collection(&self, name: &str) -> Option<Arc<dyn Collection>> {
        self.collections.get(name).map(|entry| entry.value().clone())
    }

    /// Deferred reference to a collection that may not be registered yet.
    ///
    /// The reference does not keep the catalog alive.
    pub fn collection_fn(self: &Arc<Self>, name: &str) -> CollectionFn {
        let catalog: Weak<Catalog> = Arc::downgrade(self);
        let name = name.to_string();
        lazy_collection(move || catalog.upgrade().and_then(|catalog| catalog.collection(&name)))
    }

    /// Register a model type under its name; names must be unique
    pub fn register_model(&self, model: Arc<ModelType>) -> ModelResult<()> {
        match self.models.entry(model.name().to_string()) {
            Entry::Occupied(entry) => Err(ModelError::configuration(format!(
                "Model type '{}' is already registered",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                tracing::debug!("Registered model type '{}'", entry.key());
                entry.insert(model);
                Ok(())
            }
        }
    }

    pub fn model(&self, name: &str) -> Option<Arc<ModelType>> {
        self.models.get(name).map(|entry| entry.value().clone())
    }

    /// Names of all registered model types, sorted
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Names of all registered collections, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }
}

static GLOBAL_CATALOG: Lazy<Arc<Catalog>> = Lazy::new(|| Arc::new(Catalog::new()));

/// Process-wide catalog
pub fn global_catalog() -> Arc<Catalog> {
    GLOBAL_CATALOG.clone()
}
