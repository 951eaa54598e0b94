//! Documents - attribute maps bound to a model type
//!
//! A document's shape is fixed at construction. Relations are reached through
//! short-lived accessors that borrow the document, see [`Document::belongs_to`]
//! and [`Document::has_many`].

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ModelError, ModelResult};
use crate::model::ModelType;
use crate::relationships::{BelongsTo, HasMany, RelationDescription, RelationKind};
use crate::selector::ID_FIELD;

/// A record of some model type
#[derive(Clone)]
pub struct Document {
    model: Arc<ModelType>,
    attributes: Map<String, Value>,
}

impl Document {
    /// Construct a document, rejecting attributes that shadow a relation.
    ///
    /// The check runs against the effective relations of the type, so names
    /// inherited from ancestors are rejected too.
    pub fn new(model: &Arc<ModelType>, attributes: Map<String, Value>) -> ModelResult<Self> {
        model.check_attributes(&attributes)?;
        Ok(Self {
            model: model.clone(),
            attributes,
        })
    }

    /// Construct a document from a JSON object
    pub fn from_value(model: &Arc<ModelType>, value: Value) -> ModelResult<Self> {
        match value {
            Value::Object(attributes) => Self::new(model, attributes),
            other => Err(ModelError::Serialization(format!(
                "Cannot construct '{}' document from non-object value {}",
                model.name(),
                other
            ))),
        }
    }

    pub fn model(&self) -> &Arc<ModelType> {
        &self.model
    }

    /// Raw stored value of an attribute
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Identity of a persisted document; `None` for transient documents
    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn is_persisted(&self) -> bool {
        self.id().is_some()
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn into_attributes(self) -> Map<String, Value> {
        self.attributes
    }

    /// Declare a belongs-to relation (first call only) and bind it to this document.
    ///
    /// When the relation is already effective on the document's type the stored
    /// descriptor is reused and `description` is ignored.
    pub fn belongs_to(&self, name: &str, description: RelationDescription) -> ModelResult<BelongsTo<'_>> {
        let descriptor = match self.model.relation(RelationKind::BelongsTo, name) {
            Ok(Some(descriptor)) => descriptor,
            // A pending slot means another thread is declaring it; declaring waits for it
            Ok(None) | Err(ModelError::UninitializedRelation { .. }) => {
                self.model.belongs_to(name, description)?
            }
            Err(error) => return Err(error),
        };
        Ok(BelongsTo::new(descriptor, self))
    }

    /// Declare a has-many relation (first call only) and bind it to this document
    pub fn has_many(&self, name: &str, description: RelationDescription) -> ModelResult<HasMany<'_>> {
        let descriptor = match self.model.relation(RelationKind::HasMany, name) {
            Ok(Some(descriptor)) => descriptor,
            // A pending slot means another thread is declaring it; declaring waits for it
            Ok(None) | Err(ModelError::UninitializedRelation { .. }) => {
                self.model.has_many(name, description)?
            }
            Err(error) => return Err(error),
        };
        Ok(HasMany::new(descriptor, self))
    }

    /// Bind an already declared belongs-to relation
    pub fn belongs_to_relation(&self, name: &str) -> ModelResult<BelongsTo<'_>> {
        Ok(BelongsTo::new(self.model.belongs_to_relation(name)?, self))
    }

    /// Bind an already declared has-many relation
    pub fn has_many_relation(&self, name: &str) -> ModelResult<HasMany<'_>> {
        Ok(HasMany::new(self.model.has_many_relation(name)?, self))
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.attributes.serialize(serializer)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("model", &self.model.name())
            .field("attributes", &self.attributes)
            .finish()
    }
}
