//! Relation Registry - per-type relation storage with inheritance-aware lookups
//!
//! Each model type owns its own relation maps, keyed by the type's identity.
//! The effective relation set of a type is computed on read by folding the own
//! maps of its lineage from the root type down, so subtypes override their
//! ancestors without ever mutating them.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use indexmap::IndexMap;

use crate::config::RelationConfig;
use crate::error::{ModelError, ModelResult};
use crate::model::{ModelType, ModelTypeId};

use super::metadata::{RelationDescriptor, RelationKind};

/// Once-initialized storage for one declared relation.
///
/// The slot is reserved under the registry lock and filled outside of it, so
/// concurrent declarations of the same relation agree on a single descriptor.
type RelationSlot = Arc<OnceLock<Arc<RelationDescriptor>>>;

/// Own (non-inherited) relation slots of one model type
#[derive(Default)]
struct OwnRelations {
    belongs_to: IndexMap<String, RelationSlot>,
    has_many: IndexMap<String, RelationSlot>,
}

impl OwnRelations {
    fn slots(&self, kind: RelationKind) -> &IndexMap<String, RelationSlot> {
        match kind {
            RelationKind::BelongsTo => &self.belongs_to,
            RelationKind::HasMany => &self.has_many,
        }
    }

    fn slots_mut(&mut self, kind: RelationKind) -> &mut IndexMap<String, RelationSlot> {
        match kind {
            RelationKind::BelongsTo => &mut self.belongs_to,
            RelationKind::HasMany => &mut self.has_many,
        }
    }
}

/// Snapshot of relation descriptors split by kind, in declaration order
#[derive(Debug, Clone, Default)]
pub struct RelationSet {
    pub belongs_to: IndexMap<String, Arc<RelationDescriptor>>,
    pub has_many: IndexMap<String, Arc<RelationDescriptor>>,
}

impl RelationSet {
    pub fn of_kind(&self, kind: RelationKind) -> &IndexMap<String, Arc<RelationDescriptor>> {
        match kind {
            RelationKind::BelongsTo => &self.belongs_to,
            RelationKind::HasMany => &self.has_many,
        }
    }

    fn of_kind_mut(&mut self, kind: RelationKind) -> &mut IndexMap<String, Arc<RelationDescriptor>> {
        match kind {
            RelationKind::BelongsTo => &mut self.belongs_to,
            RelationKind::HasMany => &mut self.has_many,
        }
    }

    pub fn get(&self, kind: RelationKind, name: &str) -> Option<&Arc<RelationDescriptor>> {
        self.of_kind(kind).get(name)
    }

    pub fn contains(&self, kind: RelationKind, name: &str) -> bool {
        self.of_kind(kind).contains_key(name)
    }

    /// Relation names of one kind
    pub fn names(&self, kind: RelationKind) -> Vec<String> {
        self.of_kind(kind).keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.belongs_to.len() + self.has_many.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge another layer over this one; relations in `layer` win on name collision
    fn overlay(&mut self, layer: RelationSet) {
        self.belongs_to.extend(layer.belongs_to);
        self.has_many.extend(layer.has_many);
    }
}

/// Registry of relation declarations for every model type
pub struct RelationRegistry {
    relations: DashMap<ModelTypeId, OwnRelations>,
    config: RelationConfig,
}

impl Default for RelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationRegistry {
    /// Create a new empty registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RelationConfig::default())
    }

    /// Create a new empty registry
    pub fn with_config(config: RelationConfig) -> Self {
        Self {
            relations: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RelationConfig {
        &self.config
    }

    /// Declare a relation on a model type's own layer.
    ///
    /// Exactly once per (type, kind, name): the first call builds and stores the
    /// descriptor, every later call returns the stored one without running
    /// `build` again. A name already taken by the other kind on the same layer
    /// is rejected.
    pub fn declare<F>(
        &self,
        model: &ModelType,
        kind: RelationKind,
        name: &str,
        build: F,
    ) -> ModelResult<Arc<RelationDescriptor>>
    where
        F: FnOnce() -> RelationDescriptor,
    {
        let slot = {
            let mut own = self.relations.entry(model.id()).or_default();
            // Checked under the entry guard so the two kinds cannot race
            if own.slots(kind.opposite()).contains_key(name) {
                return Err(kind_conflict(model, kind, name));
            }
            own.slots_mut(kind)
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(OnceLock::new()))
                .clone()
        };

        let mut created = false;
        let descriptor = slot
            .get_or_init(|| {
                created = true;
                Arc::new(build())
            })
            .clone();

        if created {
            tracing::debug!("Registered {} relation '{}' on '{}'", kind, name, model.name());
        }

        Ok(descriptor)
    }

    /// Relations declared directly on this model type
    pub fn own_relations(&self, model: &ModelType) -> RelationSet {
        let own = self.relations.entry(model.id()).or_default();
        let mut set = RelationSet::default();
        for kind in [RelationKind::BelongsTo, RelationKind::HasMany] {
            for (name, slot) in own.slots(kind) {
                match slot.get() {
                    Some(descriptor) => {
                        set.of_kind_mut(kind).insert(name.clone(), descriptor.clone());
                    }
                    None => tracing::debug!(
                        "Skipping {} relation '{}' on '{}' while it is being declared",
                        kind,
                        name,
                        model.name()
                    ),
                }
            }
        }
        set
    }

    /// Relations of this model type merged over those of all its ancestors
    pub fn effective_relations(&self, model: &ModelType) -> RelationSet {
        model
            .lineage()
            .into_iter()
            .fold(RelationSet::default(), |mut merged, level| {
                merged.overlay(self.own_relations(level));
                merged
            })
    }

    /// Look up an effective relation by kind and name
    pub fn relation(
        &self,
        model: &ModelType,
        kind: RelationKind,
        name: &str,
    ) -> ModelResult<Option<Arc<RelationDescriptor>>> {
        for level in model.lineage().into_iter().rev() {
            let slot = self
                .relations
                .get(&level.id())
                .and_then(|own| own.slots(kind).get(name).cloned());

            if let Some(slot) = slot {
                return match slot.get() {
                    Some(descriptor) => Ok(Some(descriptor.clone())),
                    None => Err(ModelError::UninitializedRelation {
                        model: level.name().to_string(),
                        relation: name.to_string(),
                    }),
                };
            }
        }
        Ok(None)
    }

    /// Check whether a relation is declared on the type's own layer
    pub fn has_own_relation(&self, model: &ModelType, kind: RelationKind, name: &str) -> bool {
        self.relations
            .get(&model.id())
            .map(|own| own.slots(kind).contains_key(name))
            .unwrap_or(false)
    }

    /// Get statistics about the registry
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            total_models: self.relations.len(),
            ..RegistryStats::default()
        };
        for entry in self.relations.iter() {
            stats.belongs_to_relations += entry.value().belongs_to.len();
            stats.has_many_relations += entry.value().has_many.len();
        }
        stats
    }
}

/// Error for a relation name already used by the other relation kind
pub(crate) fn kind_conflict(model: &ModelType, kind: RelationKind, name: &str) -> ModelError {
    ModelError::configuration(format!(
        "Cannot declare {} relation '{}' on '{}': a {} relation with the same name exists",
        kind,
        name,
        model.name(),
        kind.opposite()
    ))
}

/// Statistics about the relation registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_models: usize,
    pub belongs_to_relations: usize,
    pub has_many_relations: usize,
}

impl RegistryStats {
    pub fn total_relations(&self) -> usize {
        self.belongs_to_relations + self.has_many_relations
    }
}

/// Global registry instance for the application
static GLOBAL_REGISTRY: OnceLock<Arc<RelationRegistry>> = OnceLock::new();

/// Get the global relation registry, configured from the environment
pub fn global_registry() -> Arc<RelationRegistry> {
    GLOBAL_REGISTRY
        .get_or_init(|| Arc::new(RelationRegistry::with_config(RelationConfig::from_env_or_default())))
        .clone()
}
