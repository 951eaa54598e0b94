//! Collection interface - the document store boundary
//!
//! The relation engine never talks to a database directly. It builds selectors
//! and hands them to whatever implements [`Collection`].

use std::fmt;
use std::sync::Arc;

use crate::document::Document;
use crate::error::ModelResult;
use crate::selector::{FindOptions, Selector};

/// A named, queryable document collection
pub trait Collection: Send + Sync {
    /// Stable collection name, used for foreign key inference
    fn name(&self) -> &str;

    /// Find the first document matching the selector
    fn find_one(&self, selector: &Selector, options: &FindOptions) -> ModelResult<Option<Document>>;

    /// Find all documents matching the selector, in the collection's natural order
    fn find(&self, selector: &Selector, options: &FindOptions) -> ModelResult<Cursor>;
}

/// Deferred collection reference.
///
/// Evaluated at resolution time so that two model types may reference each
/// other's collections before either collection exists.
pub type CollectionFn = Arc<dyn Fn() -> Option<Arc<dyn Collection>> + Send + Sync>;

/// Wrap an existing collection in a deferred reference
pub fn collection_ref(collection: Arc<dyn Collection>) -> CollectionFn {
    Arc::new(move || Some(collection.clone()))
}

/// Build a deferred reference from a closure
pub fn lazy_collection<F>(resolve: F) -> CollectionFn
where
    F: Fn() -> Option<Arc<dyn Collection>> + Send + Sync + 'static,
{
    Arc::new(resolve)
}

/// Ordered result set returned by [`Collection::find`].
///
/// Fetching is repeatable: every call to [`Cursor::fetch`] yields the full set.
#[derive(Clone, Default)]
pub struct Cursor {
    documents: Vec<Document>,
}

impl Cursor {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Cursor over nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// All documents in order
    pub fn fetch(&self) -> Vec<Document> {
        self.documents.clone()
    }

    pub fn for_each<F>(&self, visit: F)
    where
        F: FnMut(&Document),
    {
        self.documents.iter().for_each(visit);
    }

    pub fn map<T, F>(&self, transform: F) -> Vec<T>
    where
        F: FnMut(&Document) -> T,
    {
        self.documents.iter().map(transform).collect()
    }

    pub fn count(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Identities of all documents that have one
    pub fn ids(&self) -> Vec<String> {
        self.documents
            .iter()
            .filter_map(|document| document.id().map(str::to_string))
            .collect()
    }

    pub fn into_vec(self) -> Vec<Document> {
        self.documents
    }
}

impl IntoIterator for Cursor {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("ids", &self.ids())
            .finish()
    }
}
