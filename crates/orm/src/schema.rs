//! Validation schema - field descriptors for belongs-to foreign keys
//!
//! Every effective belongs-to relation of a model type contributes one field,
//! keyed by its foreign key. A field validates that a candidate identity refers
//! to an existing, in-scope target record. Interpreting the result is left to
//! whatever form or validation layer consumes the schema.

use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ModelError, ModelResult};
use crate::model::ModelType;
use crate::relationships::RelationDescriptor;
use crate::selector::{FindOptions, Selector, ID_FIELD};

/// Value type of a generated field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    /// A string holding a record identity
    StringIdentifier,
}

/// Why a candidate value was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationErrorKind {
    /// A required value is missing
    Required,
    /// The value does not identify an allowed target
    NotAllowed,
    /// The value is not a string
    ExpectedString,
}

/// One rejected field of a validated attribute map
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidationError {
    pub name: String,
    pub kind: ValidationErrorKind,
    pub value: Value,
}

/// Schema field for one belongs-to relation
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    field_name: String,
    value_type: ValueType,
    relation: Arc<RelationDescriptor>,
}

impl FieldDescriptor {
    pub fn new(relation: Arc<RelationDescriptor>) -> ModelResult<Self> {
        Ok(Self {
            field_name: relation.foreign_key()?,
            value_type: ValueType::StringIdentifier,
            relation,
        })
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn relation(&self) -> &Arc<RelationDescriptor> {
        &self.relation
    }

    /// Display label of the field
    pub fn label(&self) -> &str {
        self.relation.human_name()
    }

    pub fn optional(&self) -> bool {
        self.relation.optional()
    }

    /// Check a candidate value.
    ///
    /// Missing values (absent, null, empty string) only fail when the relation
    /// is required. Present values must name a target record that exists and
    /// satisfies the relation's selector scope.
    pub fn validate(&self, candidate: Option<&Value>) -> ModelResult<Option<ValidationErrorKind>> {
        let id = match candidate {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) if id.is_empty() => None,
            Some(Value::String(id)) => Some(id),
            Some(_) => return Ok(Some(ValidationErrorKind::ExpectedString)),
        };

        let Some(id) = id else {
            return Ok((!self.optional()).then_some(ValidationErrorKind::Required));
        };

        if let Some(allowed) = self.relation.allowed_ids() {
            if !allowed.iter().any(|allowed| allowed == id) {
                return Ok(Some(ValidationErrorKind::NotAllowed));
            }
        }

        let selector = self.relation.selector().merge(Selector::by_id(id.as_str()));
        let options = self.relation.options().merge(FindOptions::new().fields([ID_FIELD]));
        let target = self.relation.collection()?.find_one(&selector, &options)?;

        Ok(target.is_none().then_some(ValidationErrorKind::NotAllowed))
    }
}

/// Ordered set of generated fields
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: IndexMap<String, FieldDescriptor>,
}

impl Schema {
    /// Build the schema of a model type from its effective belongs-to relations.
    ///
    /// Two relations stored under the same foreign key are a configuration error.
    pub fn for_model(model: &ModelType) -> ModelResult<Self> {
        let mut fields: IndexMap<String, FieldDescriptor> = IndexMap::new();
        for relation in model.relations().belongs_to.into_values() {
            let field = FieldDescriptor::new(relation)?;
            match fields.entry(field.field_name.clone()) {
                Entry::Occupied(existing) => {
                    return Err(ModelError::configuration(format!(
                        "Belongs-to relations '{}' and '{}' on '{}' share the foreign key '{}'",
                        existing.get().relation.name(),
                        field.relation.name(),
                        model.name(),
                        field.field_name
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(field);
                }
            }
        }
        Ok(Self { fields })
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate every field against an attribute map
    pub fn validate(&self, attributes: &Map<String, Value>) -> ModelResult<Vec<FieldValidationError>> {
        let mut errors = Vec::new();
        for field in self.fields.values() {
            let value = attributes.get(&field.field_name);
            if let Some(kind) = field.validate(value)? {
                errors.push(FieldValidationError {
                    name: field.field_name.clone(),
                    kind,
                    value: value.cloned().unwrap_or(Value::Null),
                });
            }
        }
        Ok(errors)
    }

    pub fn is_valid(&self, attributes: &Map<String, Value>) -> ModelResult<bool> {
        Ok(self.validate(attributes)?.is_empty())
    }
}
