//! In-memory collection - an ordered, process-local document store
//!
//! Keeps records in insertion order and supports the selector subset the
//! relation engine emits: equality, `$in`, `limit`, `skip` and `fields`.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::collection::{Collection, Cursor};
use crate::document::Document;
use crate::error::{ModelError, ModelResult};
use crate::model::ModelType;
use crate::relationships::RelationRegistry;
use crate::selector::{FindOptions, Selector, ID_FIELD};

type Records = IndexMap<String, Map<String, Value>>;

/// Ordered in-memory collection
pub struct MemoryCollection {
    name: String,
    records: RwLock<Records>,
    model: RwLock<Option<Weak<ModelType>>>,
    untyped: Arc<ModelType>,
}

impl MemoryCollection {
    /// Create an empty collection whose documents have no relations
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let untyped = ModelType::builder(name.clone())
            .registry(Arc::new(RelationRegistry::new()))
            .build();
        Self {
            name,
            records: RwLock::new(IndexMap::new()),
            model: RwLock::new(None),
            untyped,
        }
    }

    /// Type the documents this collection returns.
    ///
    /// The collection keeps a weak reference so that a model type may in turn
    /// use this collection as its own.
    pub fn bind_model(&self, model: &Arc<ModelType>) -> ModelResult<()> {
        let mut bound = self
            .model
            .write()
            .map_err(|_| self.poisoned())?;
        *bound = Some(Arc::downgrade(model));
        Ok(())
    }

    /// Insert a record, generating an identity when it has none
    pub fn insert(&self, mut attributes: Map<String, Value>) -> ModelResult<String> {
        let id = match attributes.get(ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::String(_)) | Some(Value::Null) | None => {
                let id = Uuid::new_v4().to_string();
                attributes.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                id
            }
            Some(other) => {
                return Err(ModelError::Collection(format!(
                    "Identity of a '{}' record must be a string, got {}",
                    self.name, other
                )))
            }
        };

        let mut records = self.write()?;
        if records.contains_key(&id) {
            return Err(ModelError::Collection(format!(
                "Duplicate identity '{}' in collection '{}'",
                id, self.name
            )));
        }
        records.insert(id.clone(), attributes);
        tracing::trace!("Inserted '{}' into '{}'", id, self.name);
        Ok(id)
    }

    /// Insert a record given as a JSON object
    pub fn insert_value(&self, value: Value) -> ModelResult<String> {
        match value {
            Value::Object(attributes) => self.insert(attributes),
            other => Err(ModelError::Serialization(format!(
                "Cannot insert non-object value {} into '{}'",
                other, self.name
            ))),
        }
    }

    pub fn len(&self) -> ModelResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> ModelResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> ModelResult<RwLockReadGuard<'_, Records>> {
        self.records.read().map_err(|_| self.poisoned())
    }

    fn write(&self) -> ModelResult<RwLockWriteGuard<'_, Records>> {
        self.records.write().map_err(|_| self.poisoned())
    }

    fn poisoned(&self) -> ModelError {
        ModelError::Collection(format!("Collection '{}' lock poisoned", self.name))
    }

    fn document_model(&self) -> ModelResult<Arc<ModelType>> {
        let bound = self.model.read().map_err(|_| self.poisoned())?;
        Ok(bound
            .as_ref()
            .and_then(Weak::upgrade)
            .unwrap_or_else(|| self.untyped.clone()))
    }

    fn select(&self, selector: &Selector, options: &FindOptions) -> ModelResult<Vec<Document>> {
        let model = self.document_model()?;
        let records = self.read()?;

        records
            .values()
            .filter(|attributes| selector.matches(attributes))
            .skip(options.skip_value().unwrap_or(0))
            .take(options.limit_value().unwrap_or(usize::MAX))
            .map(|attributes| Document::new(&model, project(attributes, options)))
            .collect()
    }
}

/// Apply a `fields` projection; the identity is always kept
fn project(attributes: &Map<String, Value>, options: &FindOptions) -> Map<String, Value> {
    let Some(projection) = options.get("fields").and_then(Value::as_object) else {
        return attributes.clone();
    };

    match options.projected_fields() {
        Some(included) if !included.is_empty() => attributes
            .iter()
            .filter(|(field, _)| field.as_str() == ID_FIELD || included.contains(&field.as_str()))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect(),
        _ => attributes
            .iter()
            .filter(|(field, _)| field.as_str() == ID_FIELD || !projection.contains_key(field.as_str()))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect(),
    }
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_one(&self, selector: &Selector, options: &FindOptions) -> ModelResult<Option<Document>> {
        let options = options.clone().limit(1);
        Ok(self.select(selector, &options)?.into_iter().next())
    }

    fn find(&self, selector: &Selector, options: &FindOptions) -> ModelResult<Cursor> {
        Ok(Cursor::new(self.select(selector, options)?))
    }
}

impl fmt::Debug for MemoryCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCollection")
            .field("name", &self.name)
            .field("len", &self.len().ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn accounts() -> MemoryCollection {
        let accounts = MemoryCollection::new("accounts");
        for (id, owner) in [("t1", "tyrell"), ("t2", "tyrell"), ("y1", "yoyodyne")] {
            accounts
                .insert_value(json!({ "_id": id, "ownerId": owner, "balance": 10 }))
                .unwrap();
        }
        accounts
    }

    #[test]
    fn test_insert_generates_identity() {
        let accounts = MemoryCollection::new("accounts");
        let id = accounts.insert_value(json!({ "ownerId": "tyrell" })).unwrap();

        assert!(Uuid::parse_str(&id).is_ok());
        let found = accounts.find_one(&Selector::by_id(id.clone()), &FindOptions::new()).unwrap();
        assert_eq!(found.unwrap().id(), Some(id.as_str()));
    }

    #[test]
    fn test_duplicate_identity_is_rejected() {
        let accounts = accounts();
        let error = accounts.insert_value(json!({ "_id": "t1" })).unwrap_err();
        assert!(matches!(error, ModelError::Collection(_)));
        assert_eq!(accounts.len().unwrap(), 3);
    }

    #[test]
    fn test_find_keeps_insertion_order() {
        let cursor = accounts()
            .find(&Selector::new().eq("ownerId", "tyrell"), &FindOptions::new())
            .unwrap();
        assert_eq!(cursor.ids(), vec!["t1".to_string(), "t2".to_string()]);
        // fetch is repeatable
        assert_eq!(cursor.fetch().len(), cursor.fetch().len());
    }

    #[test]
    fn test_skip_and_limit() {
        let cursor = accounts()
            .find(&Selector::new(), &FindOptions::new().skip(1).limit(1))
            .unwrap();
        assert_eq!(cursor.ids(), vec!["t2".to_string()]);
    }

    #[test]
    fn test_projection_keeps_identity() {
        let accounts = accounts();
        let included = accounts
            .find_one(&Selector::by_id("t1"), &FindOptions::new().fields(["ownerId"]))
            .unwrap()
            .unwrap();
        assert_eq!(included.attributes().len(), 2);
        assert_eq!(included.get("balance"), None);

        let excluded = accounts
            .find_one(
                &Selector::by_id("t1"),
                &FindOptions::new().set("fields", json!({ "balance": 0 })),
            )
            .unwrap()
            .unwrap();
        assert_eq!(excluded.get("ownerId"), Some(&json!("tyrell")));
        assert_eq!(excluded.get("balance"), None);
    }

    #[test]
    fn test_bound_model_types_documents() {
        let accounts = accounts();
        let account = ModelType::builder("Account")
            .registry(Arc::new(RelationRegistry::new()))
            .build();
        accounts.bind_model(&account).unwrap();

        let found = accounts
            .find_one(&Selector::by_id("t1"), &FindOptions::new())
            .unwrap()
            .unwrap();
        assert_eq!(found.model().id(), account.id());

        drop(found);
        drop(account);
        let found = accounts
            .find_one(&Selector::by_id("t1"), &FindOptions::new())
            .unwrap()
            .unwrap();
        assert_eq!(found.model().name(), "accounts");
    }
}
