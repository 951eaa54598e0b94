//! Model Types - runtime type objects that own relation declarations
//!
//! A [`ModelType`] stands in for a document class: it has a name, an optional
//! parent it inherits relations from, an optional source collection, and a
//! handle to the registry holding its relation declarations. Subtypes are
//! created with [`ModelType::extend`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::collection::{collection_ref, Collection, CollectionFn};
use crate::error::{ModelError, ModelResult};
use crate::relationships::{
    global_registry, RelationDescription, RelationDescriptor, RelationKind, RelationRegistry,
    RelationResolver, RelationSet, RelationSource,
};
use crate::relationships::registry::kind_conflict;
use crate::schema::Schema;

static NEXT_MODEL_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a model type, unique per process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelTypeId(u64);

impl ModelTypeId {
    fn next() -> Self {
        Self(NEXT_MODEL_TYPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModelTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Runtime type object for a family of documents
pub struct ModelType {
    id: ModelTypeId,
    name: String,
    parent: Option<Arc<ModelType>>,
    collection: Option<CollectionFn>,
    registry: Arc<RelationRegistry>,
}

impl ModelType {
    /// Start building a root model type
    pub fn builder(name: impl Into<String>) -> ModelTypeBuilder {
        ModelTypeBuilder {
            name: name.into(),
            parent: None,
            collection: None,
            registry: None,
        }
    }

    /// Start building a subtype; it shares this type's registry and collection
    /// unless told otherwise
    pub fn extend(self: &Arc<Self>, name: impl Into<String>) -> ModelTypeBuilder {
        ModelTypeBuilder {
            name: name.into(),
            parent: Some(self.clone()),
            collection: self.collection.clone(),
            registry: Some(self.registry.clone()),
        }
    }

    pub fn id(&self) -> ModelTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<ModelType>> {
        self.parent.as_ref()
    }

    /// The type's own collection, if one is defined yet
    pub fn collection(&self) -> Option<Arc<dyn Collection>> {
        self.collection.as_ref().and_then(|collection| collection())
    }

    pub fn registry(&self) -> &Arc<RelationRegistry> {
        &self.registry
    }

    /// Resolver configured by this type's registry
    pub fn resolver(&self) -> RelationResolver {
        RelationResolver::new(self.registry.config())
    }

    /// The type's ancestor chain, root first, ending with this type
    pub fn lineage(&self) -> Vec<&ModelType> {
        let mut lineage = Vec::new();
        let mut current = Some(self);
        while let Some(model) = current {
            lineage.push(model);
            current = model.parent.as_deref();
        }
        lineage.reverse();
        lineage
    }

    /// Returns true if `other` is this type or one of its ancestors
    pub fn is_subtype_of(&self, other: &ModelType) -> bool {
        self.lineage().iter().any(|model| model.id == other.id)
    }

    /// Declare a belongs-to relation on this type
    pub fn belongs_to(
        &self,
        name: &str,
        description: RelationDescription,
    ) -> ModelResult<Arc<RelationDescriptor>> {
        self.declare(RelationKind::BelongsTo, name, description)
    }

    /// Declare a has-many relation on this type
    pub fn has_many(
        &self,
        name: &str,
        description: RelationDescription,
    ) -> ModelResult<Arc<RelationDescriptor>> {
        self.declare(RelationKind::HasMany, name, description)
    }

    /// Declare a relation on this type's own layer.
    ///
    /// Repeated declarations return the stored descriptor. A subtype declaring
    /// an inherited name gets its own descriptor that shadows the ancestor's.
    pub fn declare(
        &self,
        kind: RelationKind,
        name: &str,
        description: RelationDescription,
    ) -> ModelResult<Arc<RelationDescriptor>> {
        // Inherited names of the other kind; the own layer is checked by the registry
        match self.registry.relation(self, kind.opposite(), name) {
            Ok(None) => {}
            Ok(Some(_)) | Err(ModelError::UninitializedRelation { .. }) => {
                return Err(kind_conflict(self, kind, name));
            }
            Err(error) => return Err(error),
        }

        self.registry.declare(self, kind, name, || {
            RelationDescriptor::new(name, kind, self.relation_source(), description)
        })
    }

    fn relation_source(&self) -> RelationSource {
        RelationSource {
            model: self.name.clone(),
            collection: self.collection.clone(),
        }
    }

    /// Effective relations: own declarations merged over all ancestors'
    pub fn relations(&self) -> RelationSet {
        self.registry.effective_relations(self)
    }

    /// Relations declared directly on this type
    pub fn own_relations(&self) -> RelationSet {
        self.registry.own_relations(self)
    }

    /// Look up an effective relation
    pub fn relation(&self, kind: RelationKind, name: &str) -> ModelResult<Option<Arc<RelationDescriptor>>> {
        self.registry.relation(self, kind, name)
    }

    pub fn belongs_to_relation(&self, name: &str) -> ModelResult<Arc<RelationDescriptor>> {
        self.require_relation(RelationKind::BelongsTo, name)
    }

    pub fn has_many_relation(&self, name: &str) -> ModelResult<Arc<RelationDescriptor>> {
        self.require_relation(RelationKind::HasMany, name)
    }

    fn require_relation(&self, kind: RelationKind, name: &str) -> ModelResult<Arc<RelationDescriptor>> {
        self.relation(kind, name)?.ok_or_else(|| ModelError::RelationNotFound {
            model: self.name.clone(),
            relation: name.to_string(),
            kind,
        })
    }

    /// Check that no attribute shadows an effective relation
    pub fn check_attributes(&self, attributes: &Map<String, Value>) -> ModelResult<()> {
        let relations = self.relations();
        for attribute in attributes.keys() {
            for kind in [RelationKind::HasMany, RelationKind::BelongsTo] {
                if relations.contains(kind, attribute) {
                    return Err(ModelError::AttributeCollision {
                        attribute: attribute.clone(),
                        kind,
                    });
                }
            }
        }
        Ok(())
    }

    /// Validation schema with one field per effective belongs-to relation
    pub fn generate_schema(&self) -> ModelResult<Schema> {
        Schema::for_model(self)
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|parent| parent.name.clone()))
            .field("has_collection", &self.collection.is_some())
            .finish()
    }
}

/// Builder for [`ModelType`]
pub struct ModelTypeBuilder {
    name: String,
    parent: Option<Arc<ModelType>>,
    collection: Option<CollectionFn>,
    registry: Option<Arc<RelationRegistry>>,
}

impl ModelTypeBuilder {
    /// Use an existing collection as the type's own collection
    pub fn collection(mut self, collection: Arc<dyn Collection>) -> Self {
        self.collection = Some(collection_ref(collection));
        self
    }

    /// Use a deferred collection reference, resolved on each use
    pub fn collection_fn(mut self, collection: CollectionFn) -> Self {
        self.collection = Some(collection);
        self
    }

    /// Store relation declarations in a specific registry instead of the global one
    pub fn registry(mut self, registry: Arc<RelationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Arc<ModelType> {
        let model = ModelType {
            id: ModelTypeId::next(),
            name: self.name,
            parent: self.parent,
            collection: self.collection,
            registry: self.registry.unwrap_or_else(global_registry),
        };
        tracing::debug!("Defined model type '{}' ({})", model.name, model.id);
        Arc::new(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCollection;
    use serde_json::json;

    fn registry() -> Arc<RelationRegistry> {
        Arc::new(RelationRegistry::new())
    }

    fn companies() -> Arc<MemoryCollection> {
        Arc::new(MemoryCollection::new("companies"))
    }

    fn attributes(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_model_type_ids_are_unique() {
        let a = ModelType::builder("Account").registry(registry()).build();
        let b = ModelType::builder("Account").registry(registry()).build();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_lineage_is_root_first() {
        let base = ModelType::builder("Base").registry(registry()).build();
        let child = base.extend("Child").build();
        let grandchild = child.extend("Grandchild").build();

        let names: Vec<&str> = grandchild.lineage().iter().map(|model| model.name()).collect();
        assert_eq!(names, vec!["Base", "Child", "Grandchild"]);
        assert!(grandchild.is_subtype_of(&base));
        assert!(!base.is_subtype_of(&child));
    }

    #[test]
    fn test_subtype_inherits_collection_and_registry() {
        let base = ModelType::builder("Company")
            .collection(companies())
            .registry(registry())
            .build();
        let child = base.extend("PublicCompany").build();

        assert_eq!(child.collection().unwrap().name(), "companies");
        assert!(Arc::ptr_eq(child.registry(), base.registry()));
    }

    #[test]
    fn test_declaration_is_idempotent() {
        let account = ModelType::builder("Account").registry(registry()).build();

        let first = account
            .belongs_to("owner", RelationDescription::to(companies()))
            .unwrap();
        let second = account
            .belongs_to("owner", RelationDescription::to(companies()).foreign_key("holder"))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.foreign_key().unwrap(), "ownerId");
    }

    #[test]
    fn test_cross_kind_name_is_rejected() {
        let company = ModelType::builder("Company")
            .collection(companies())
            .registry(registry())
            .build();
        company
            .has_many("accounts", RelationDescription::to(Arc::new(MemoryCollection::new("accounts"))))
            .unwrap();

        let error = company
            .belongs_to("accounts", RelationDescription::to(companies()))
            .unwrap_err();
        assert!(error.is_configuration());
    }

    #[test]
    fn test_cross_kind_name_is_rejected_on_subtype() {
        let company = ModelType::builder("Company")
            .collection(companies())
            .registry(registry())
            .build();
        company
            .has_many("accounts", RelationDescription::to(Arc::new(MemoryCollection::new("accounts"))))
            .unwrap();
        let bank = company.extend("Bank").build();

        let error = bank
            .belongs_to("accounts", RelationDescription::to(companies()))
            .unwrap_err();
        assert!(error.is_configuration());
        assert!(bank.own_relations().is_empty());
    }

    #[test]
    fn test_missing_relation_lookup() {
        let account = ModelType::builder("Account").registry(registry()).build();
        let error = account.belongs_to_relation("owner").unwrap_err();
        assert!(matches!(
            error,
            ModelError::RelationNotFound {
                kind: RelationKind::BelongsTo,
                ..
            }
        ));
    }

    #[test]
    fn test_check_attributes_reports_both_kinds() {
        let company = ModelType::builder("Company")
            .collection(companies())
            .registry(registry())
            .build();
        company
            .has_many("accounts", RelationDescription::to(Arc::new(MemoryCollection::new("accounts"))))
            .unwrap();
        company
            .belongs_to("parent", RelationDescription::to(companies()))
            .unwrap();

        assert!(company.check_attributes(&attributes(json!({ "name": "Tyrell" }))).is_ok());

        let error = company
            .check_attributes(&attributes(json!({ "accounts": [] })))
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Cannot construct Document: ‘accounts’ is no valid property. ‘accounts’ is already a defined has-many relation."
        );

        let error = company
            .check_attributes(&attributes(json!({ "parent": "tyrell" })))
            .unwrap_err();
        assert!(error.to_string().contains("Did you mean to use ‘parentId’?"));
    }
}
