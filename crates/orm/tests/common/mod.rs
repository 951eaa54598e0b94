//! Shared fixtures: companies, their accounts, and transactions between accounts
#![allow(dead_code)]

use std::sync::Arc;

use docrel_orm::{
    Catalog, Collection, Document, FindOptions, MemoryCollection, ModelType, RelationConfig,
    RelationDescription, RelationRegistry, Selector,
};
use serde_json::json;

pub struct Fixture {
    pub catalog: Arc<Catalog>,
    pub registry: Arc<RelationRegistry>,
    pub companies: Arc<MemoryCollection>,
    pub accounts: Arc<MemoryCollection>,
    pub transactions: Arc<MemoryCollection>,
    pub company: Arc<ModelType>,
    pub account: Arc<ModelType>,
    pub transaction: Arc<ModelType>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(RelationConfig::default())
    }

    pub fn with_config(config: RelationConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let registry = Arc::new(RelationRegistry::with_config(config));

        // Model types reference collections before they exist
        let company = ModelType::builder("Company")
            .collection_fn(catalog.collection_fn("companies"))
            .registry(registry.clone())
            .build();
        let account = ModelType::builder("Account")
            .collection_fn(catalog.collection_fn("accounts"))
            .registry(registry.clone())
            .build();
        let transaction = ModelType::builder("Transaction")
            .collection_fn(catalog.collection_fn("transactions"))
            .registry(registry.clone())
            .build();

        company
            .has_many(
                "accounts",
                RelationDescription::new(catalog.collection_fn("accounts")).foreign_key("owner"),
            )
            .unwrap();
        company
            .has_many(
                "incomingTransactions",
                RelationDescription::new(catalog.collection_fn("transactions"))
                    .through(catalog.collection_fn("accounts"))
                    .through_foreign_key("owner")
                    .foreign_key("targetAccountId"),
            )
            .unwrap();
        company
            .has_many(
                "outgoingTransactions",
                RelationDescription::new(catalog.collection_fn("transactions"))
                    .through(catalog.collection_fn("accounts"))
                    .through_foreign_key("owner")
                    .foreign_key("sourceAccountId"),
            )
            .unwrap();
        // Belongs-to keys are inferred from the relation names
        account
            .belongs_to("owner", RelationDescription::new(catalog.collection_fn("companies")))
            .unwrap();
        transaction
            .belongs_to(
                "sourceAccount",
                RelationDescription::new(catalog.collection_fn("accounts")),
            )
            .unwrap();
        transaction
            .belongs_to(
                "targetAccount",
                RelationDescription::new(catalog.collection_fn("accounts")),
            )
            .unwrap();

        let companies = Arc::new(MemoryCollection::new("companies"));
        let accounts = Arc::new(MemoryCollection::new("accounts"));
        let transactions = Arc::new(MemoryCollection::new("transactions"));
        companies.bind_model(&company).unwrap();
        accounts.bind_model(&account).unwrap();
        transactions.bind_model(&transaction).unwrap();

        for record in [
            json!({ "_id": "tyrell", "name": "Tyrell Corporation" }),
            json!({ "_id": "yoyodyne", "name": "Yoyodyne Propulsion Systems" }),
        ] {
            companies.insert_value(record).unwrap();
        }
        for record in [
            json!({ "_id": "t1", "ownerId": "tyrell" }),
            json!({ "_id": "t2", "ownerId": "tyrell" }),
            json!({ "_id": "y1", "ownerId": "yoyodyne" }),
        ] {
            accounts.insert_value(record).unwrap();
        }
        for record in [
            json!({ "_id": "tx1", "sourceAccountId": "t1", "targetAccountId": "y1" }),
            json!({ "_id": "tx2", "sourceAccountId": "y1", "targetAccountId": "t1" }),
        ] {
            transactions.insert_value(record).unwrap();
        }

        catalog.register_collection(companies.clone());
        catalog.register_collection(accounts.clone());
        catalog.register_collection(transactions.clone());

        Self {
            catalog,
            registry,
            companies,
            accounts,
            transactions,
            company,
            account,
            transaction,
        }
    }

    pub fn company(&self, id: &str) -> Document {
        find(&self.companies, id)
    }

    pub fn account(&self, id: &str) -> Document {
        find(&self.accounts, id)
    }

    pub fn transaction(&self, id: &str) -> Document {
        find(&self.transactions, id)
    }
}

pub fn find(collection: &MemoryCollection, id: &str) -> Document {
    collection
        .find_one(&Selector::by_id(id), &FindOptions::new())
        .unwrap()
        .unwrap_or_else(|| panic!("no record '{}' in '{}'", id, collection.name()))
}

pub fn ids(documents: &[Document]) -> Vec<&str> {
    documents.iter().filter_map(Document::id).collect()
}
