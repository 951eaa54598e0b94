//! HasMany accessor - a has-many relation bound to one document

use std::ops::Deref;
use std::sync::Arc;

use crate::collection::Cursor;
use crate::document::Document;
use crate::error::ModelResult;
use crate::selector::{FindOptions, Selector};

use super::metadata::RelationDescriptor;
use super::resolver::ResolvedQuery;

/// Target documents reference the source document, directly or through an
/// intermediate collection
pub struct HasMany<'a> {
    descriptor: Arc<RelationDescriptor>,
    document: &'a Document,
}

impl<'a> HasMany<'a> {
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

    /// Build the target query without running it.
    ///
    /// For through relations this already queries the intermediate collection.
    pub fn query(&self, options: Option<FindOptions>) -> ModelResult<ResolvedQuery> {
        self.document
            .model()
            .resolver()
            .resolve(&self.descriptor, self.document, options)
    }

    /// Selector for the targets, or `None` when nothing can match
    pub fn selector(&self) -> ModelResult<Option<Selector>> {
        Ok(self.query(None)?.selector().cloned())
    }

    /// All related documents
    pub fn find(&self) -> ModelResult<Cursor> {
        self.query(None)?.find()
    }

    pub fn find_with(&self, options: FindOptions) -> ModelResult<Cursor> {
        self.query(Some(options))?.find()
    }

    pub fn count(&self) -> ModelResult<usize> {
        Ok(self.find()?.count())
    }
}

impl Deref for HasMany<'_> {
    type Target = RelationDescriptor;

    fn deref(&self) -> &Self::Target {
        &self.descriptor
    }
}
