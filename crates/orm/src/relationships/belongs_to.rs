//! BelongsTo accessor - a belongs-to relation bound to one document

use std::ops::Deref;
use std::sync::Arc;

use crate::document::Document;
use crate::error::ModelResult;
use crate::selector::{FindOptions, Selector};

use super::metadata::RelationDescriptor;
use super::resolver::ResolvedQuery;

/// The source document stores the target's identity in its foreign key attribute
pub struct BelongsTo<'a> {
    descriptor: Arc<RelationDescriptor>,
    document: &'a Document,
}

impl<'a> BelongsTo<'a> {
    pub(crate) fn new(descriptor: Arc<RelationDescriptor>, document: &'a Document) -> Self {
        Self {
            descriptor,
            document,
        }
    }

    pub fn descriptor(&self) -> &Arc<RelationDescriptor> {
        &self.descriptor
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// Build the target query without running it
    pub fn query(&self, options: Option<FindOptions>) -> ModelResult<ResolvedQuery> {
        self.document
            .model()
            .resolver()
            .resolve(&self.descriptor, self.document, options)
    }

    /// Selector for the target, or `None` when the foreign key is not set
    pub fn selector(&self) -> ModelResult<Option<Selector>> {
        Ok(self.query(None)?.selector().cloned())
    }

    /// The related document, if the foreign key is set and points at one
    pub fn find_one(&self) -> ModelResult<Option<Document>> {
        self.query(None)?.find_one()
    }

    pub fn find_one_with(&self, options: FindOptions) -> ModelResult<Option<Document>> {
        self.query(Some(options))?.find_one()
    }

    /// The stored foreign key value as an identity
    pub fn foreign_key_value(&self) -> ModelResult<Option<String>> {
        let foreign_key = self.descriptor.foreign_key()?;
        Ok(self
            .document
            .model()
            .resolver()
            .foreign_key_value(self.document.get(&foreign_key)))
    }

    /// Check if the document has a foreign key value
    pub fn has_foreign_key(&self) -> ModelResult<bool> {
        Ok(self.foreign_key_value()?.is_some())
    }
}

impl Deref for BelongsTo<'_> {
    type Target = RelationDescriptor;

    fn deref(&self) -> &Self::Target {
        &self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::memory::MemoryCollection;
    use crate::model::ModelType;
    use crate::relationships::{RelationDescription, RelationRegistry};

    fn fixture() -> (Arc<ModelType>, Arc<MemoryCollection>) {
        let companies = Arc::new(MemoryCollection::new("companies"));
        companies
            .insert_value(json!({ "_id": "tyrell", "name": "Tyrell" }))
            .unwrap();
        let account = ModelType::builder("Account")
            .registry(Arc::new(RelationRegistry::new()))
            .build();
        account
            .belongs_to("owner", RelationDescription::to(companies.clone()))
            .unwrap();
        (account, companies)
    }

    #[test]
    fn test_find_one_follows_foreign_key() {
        let (account, _) = fixture();
        let document = Document::from_value(&account, json!({ "_id": "t1", "ownerId": "tyrell" })).unwrap();
        let owner = document.belongs_to_relation("owner").unwrap();

        assert_eq!(owner.human_name(), "Owner");
        assert_eq!(owner.foreign_key_value().unwrap().as_deref(), Some("tyrell"));
        let company = owner.find_one().unwrap().unwrap();
        assert_eq!(company.get("name"), Some(&json!("Tyrell")));
    }

    #[test]
    fn test_absent_foreign_key_finds_nothing() {
        let (account, _) = fixture();
        let document = Document::from_value(&account, json!({ "_id": "t3" })).unwrap();
        let owner = document.belongs_to_relation("owner").unwrap();

        assert!(!owner.has_foreign_key().unwrap());
        assert_eq!(owner.selector().unwrap(), None);
        assert!(owner.find_one().unwrap().is_none());
    }

    #[test]
    fn test_dangling_foreign_key_finds_nothing() {
        let (account, _) = fixture();
        let document = Document::from_value(&account, json!({ "ownerId": "initech" })).unwrap();
        let owner = document.belongs_to_relation("owner").unwrap();

        assert_eq!(owner.selector().unwrap(), Some(Selector::by_id("initech")));
        assert!(owner.find_one().unwrap().is_none());
    }

    #[test]
    fn test_find_one_with_projection() {
        let (account, _) = fixture();
        let document = Document::from_value(&account, json!({ "ownerId": "tyrell" })).unwrap();
        let owner = document.belongs_to_relation("owner").unwrap();

        let company = owner
            .find_one_with(FindOptions::new().fields(["_id"]))
            .unwrap()
            .unwrap();
        assert_eq!(company.id(), Some("tyrell"));
        assert_eq!(company.get("name"), None);
    }
}
