//! Relation Metadata System - declarations and the descriptors built from them
//!
//! A [`RelationDescription`] is what application code writes: a target
//! collection plus whatever it wants to override. A [`RelationDescriptor`] is
//! the immutable result of combining that declaration with derived defaults.
//! Every property that may depend on state defined later (collections, foreign
//! keys, scopes) is a deferred computation evaluated on each call.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collection::{collection_ref, Collection, CollectionFn};
use crate::error::{ModelError, ModelResult};
use crate::naming::{humanize, singularize};
use crate::selector::{FindOptions, Selector};

use super::inference;

/// Deferred string property
pub type StringFn = Arc<dyn Fn() -> String + Send + Sync>;
/// Deferred flag
pub type BoolFn = Arc<dyn Fn() -> bool + Send + Sync>;
/// Deferred selector scope
pub type SelectorFn = Arc<dyn Fn() -> Selector + Send + Sync>;
/// Deferred query options
pub type OptionsFn = Arc<dyn Fn() -> FindOptions + Send + Sync>;
/// Deferred list of identities
pub type IdsFn = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// Which side of the relation stores the foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// The source record stores the foreign key (many-to-one)
    BelongsTo,
    /// Target records store a foreign key pointing at the source (one-to-many)
    HasMany,
}

impl RelationKind {
    /// Returns true if this relation resolves to a collection of records
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany)
    }

    /// The other kind
    pub fn opposite(self) -> Self {
        match self {
            Self::BelongsTo => Self::HasMany,
            Self::HasMany => Self::BelongsTo,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::BelongsTo => write!(f, "belongs-to"),
            RelationKind::HasMany => write!(f, "has-many"),
        }
    }
}

/// A partial relation declaration.
///
/// Only the target collection is required; everything else is derived when
/// left out. Settings that do not apply to the declared kind (for example
/// `placeholder` on a has-many relation) are ignored.
#[derive(Clone)]
pub struct RelationDescription {
    pub(crate) collection: CollectionFn,
    pub(crate) through: Option<CollectionFn>,
    pub(crate) foreign_key: Option<StringFn>,
    pub(crate) through_foreign_key: Option<StringFn>,
    pub(crate) selector: Option<SelectorFn>,
    pub(crate) options: Option<OptionsFn>,
    pub(crate) human_name: Option<String>,
    pub(crate) human_name_singular: Option<String>,
    pub(crate) human_name_plural: Option<String>,
    pub(crate) human_collection_name: Option<StringFn>,
    pub(crate) human_collection_name_singular: Option<StringFn>,
    pub(crate) help_text: Option<StringFn>,
    pub(crate) optional: Option<BoolFn>,
    pub(crate) placeholder: Option<StringFn>,
    pub(crate) allowed_ids: Option<IdsFn>,
    pub(crate) nullify_foreign_relations: Option<BoolFn>,
}

impl RelationDescription {
    /// Describe a relation to the collection returned by a deferred reference
    pub fn new(collection: CollectionFn) -> Self {
        Self {
            collection,
            through: None,
            foreign_key: None,
            through_foreign_key: None,
            selector: None,
            options: None,
            human_name: None,
            human_name_singular: None,
            human_name_plural: None,
            human_collection_name: None,
            human_collection_name_singular: None,
            help_text: None,
            optional: None,
            placeholder: None,
            allowed_ids: None,
            nullify_foreign_relations: None,
        }
    }

    /// Describe a relation to an already existing collection
    pub fn to(collection: Arc<dyn Collection>) -> Self {
        Self::new(collection_ref(collection))
    }

    /// Resolve the relation through an intermediate collection
    pub fn through(mut self, through: CollectionFn) -> Self {
        self.through = Some(through);
        self
    }

    /// Resolve the relation through an already existing intermediate collection
    pub fn through_collection(self, through: Arc<dyn Collection>) -> Self {
        self.through(collection_ref(through))
    }

    /// Set the foreign key attribute (the `Id` suffix is added when missing)
    pub fn foreign_key(self, foreign_key: impl Into<String>) -> Self {
        let foreign_key = foreign_key.into();
        self.foreign_key_fn(move || foreign_key.clone())
    }

    pub fn foreign_key_fn<F>(mut self, foreign_key: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.foreign_key = Some(Arc::new(foreign_key));
        self
    }

    /// Set the attribute on through-collection records that references the source
    pub fn through_foreign_key(self, foreign_key: impl Into<String>) -> Self {
        let foreign_key = foreign_key.into();
        self.through_foreign_key_fn(move || foreign_key.clone())
    }

    pub fn through_foreign_key_fn<F>(mut self, foreign_key: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.through_foreign_key = Some(Arc::new(foreign_key));
        self
    }

    /// Restrict related records to a fixed scope
    pub fn selector(self, selector: Selector) -> Self {
        self.selector_fn(move || selector.clone())
    }

    pub fn selector_fn<F>(mut self, selector: F) -> Self
    where
        F: Fn() -> Selector + Send + Sync + 'static,
    {
        self.selector = Some(Arc::new(selector));
        self
    }

    /// Default query options for every resolution
    pub fn options(self, options: FindOptions) -> Self {
        self.options_fn(move || options.clone())
    }

    pub fn options_fn<F>(mut self, options: F) -> Self
    where
        F: Fn() -> FindOptions + Send + Sync + 'static,
    {
        self.options = Some(Arc::new(options));
        self
    }

    pub fn human_name(mut self, human_name: impl Into<String>) -> Self {
        self.human_name = Some(human_name.into());
        self
    }

    pub fn human_name_singular(mut self, human_name: impl Into<String>) -> Self {
        self.human_name_singular = Some(human_name.into());
        self
    }

    pub fn human_name_plural(mut self, human_name: impl Into<String>) -> Self {
        self.human_name_plural = Some(human_name.into());
        self
    }

    pub fn human_collection_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.human_collection_name = Some(Arc::new(move || name.clone()));
        self
    }

    pub fn human_collection_name_singular(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.human_collection_name_singular = Some(Arc::new(move || name.clone()));
        self
    }

    pub fn help_text(mut self, help_text: impl Into<String>) -> Self {
        let help_text = help_text.into();
        self.help_text = Some(Arc::new(move || help_text.clone()));
        self
    }

    /// Whether a belongs-to foreign key may be absent (default: optional)
    pub fn optional(self, optional: bool) -> Self {
        self.optional_fn(move || optional)
    }

    pub fn optional_fn<F>(mut self, optional: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.optional = Some(Arc::new(optional));
        self
    }

    /// UI placeholder for a belongs-to selection field
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        let placeholder = placeholder.into();
        self.placeholder = Some(Arc::new(move || placeholder.clone()));
        self
    }

    /// Restrict valid belongs-to targets to a fixed set of identities
    pub fn allowed_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        self.allowed_ids_fn(move || ids.clone())
    }

    pub fn allowed_ids_fn<F>(mut self, ids: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.allowed_ids = Some(Arc::new(ids));
        self
    }

    /// Advisory flag for collaborators that cascade updates on removal
    pub fn nullify_foreign_relations(mut self, nullify: bool) -> Self {
        self.nullify_foreign_relations = Some(Arc::new(move || nullify));
        self
    }
}

impl fmt::Debug for RelationDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationDescription")
            .field("through", &self.through.is_some())
            .field("foreign_key", &self.foreign_key.is_some())
            .field("through_foreign_key", &self.through_foreign_key.is_some())
            .field("human_name", &self.human_name)
            .finish_non_exhaustive()
    }
}

/// Where a relation was declared
#[derive(Clone)]
pub struct RelationSource {
    /// Name of the declaring model type
    pub model: String,
    /// The declaring model type's own collection, needed to infer has-many keys
    pub collection: Option<CollectionFn>,
}

/// Kind-specific descriptor data
#[derive(Clone)]
pub enum RelationVariant {
    BelongsTo {
        optional: Option<BoolFn>,
        placeholder: Option<StringFn>,
        allowed_ids: Option<IdsFn>,
    },
    HasMany {
        nullify_foreign_relations: Option<BoolFn>,
    },
}

/// Immutable, lazily evaluated schema of one relation
#[derive(Clone)]
pub struct RelationDescriptor {
    name: String,
    kind: RelationKind,
    pub(crate) source: RelationSource,
    pub(crate) collection: CollectionFn,
    pub(crate) through: Option<CollectionFn>,
    pub(crate) foreign_key: Option<StringFn>,
    pub(crate) through_foreign_key: Option<StringFn>,
    selector: Option<SelectorFn>,
    options: Option<OptionsFn>,
    human_name: String,
    human_name_singular: String,
    human_name_plural: String,
    human_collection_name: Option<StringFn>,
    human_collection_name_singular: Option<StringFn>,
    help_text: Option<StringFn>,
    variant: RelationVariant,
}

impl RelationDescriptor {
    /// Combine a declaration with derived defaults
    pub fn new(
        name: impl Into<String>,
        kind: RelationKind,
        source: RelationSource,
        description: RelationDescription,
    ) -> Self {
        let name = name.into();
        let names = inference::human_names(&name, kind, &description);

        let variant = match kind {
            RelationKind::BelongsTo => RelationVariant::BelongsTo {
                optional: description.optional,
                placeholder: description.placeholder,
                allowed_ids: description.allowed_ids,
            },
            RelationKind::HasMany => RelationVariant::HasMany {
                nullify_foreign_relations: description.nullify_foreign_relations,
            },
        };

        Self {
            name,
            kind,
            source,
            collection: description.collection,
            through: description.through,
            foreign_key: description.foreign_key,
            through_foreign_key: description.through_foreign_key,
            selector: description.selector,
            options: description.options,
            human_name: names.human_name,
            human_name_singular: names.singular,
            human_name_plural: names.plural,
            human_collection_name: description.human_collection_name,
            human_collection_name_singular: description.human_collection_name_singular,
            help_text: description.help_text,
            variant,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn variant(&self) -> &RelationVariant {
        &self.variant
    }

    /// Name of the model type that declared this relation
    pub fn source_model(&self) -> &str {
        &self.source.model
    }

    /// The target collection
    pub fn collection(&self) -> ModelResult<Arc<dyn Collection>> {
        (self.collection)().ok_or_else(|| {
            ModelError::configuration(format!(
                "{} relation on '{}' has no collection set",
                self.human_name, self.source.model
            ))
        })
    }

    /// Name of the target collection
    pub fn collection_name(&self) -> ModelResult<String> {
        Ok(self.collection()?.name().to_string())
    }

    /// Whether an intermediate collection was declared
    pub fn has_through(&self) -> bool {
        self.through.is_some()
    }

    /// The intermediate collection, if one was declared
    pub fn through(&self) -> ModelResult<Option<Arc<dyn Collection>>> {
        match &self.through {
            None => Ok(None),
            Some(through) => through().map(Some).ok_or_else(|| {
                ModelError::configuration(format!(
                    "{} relation on '{}' declares a ‘through’ collection that is not defined",
                    self.human_name, self.source.model
                ))
            }),
        }
    }

    /// Attribute holding the reference id on the owning side
    pub fn foreign_key(&self) -> ModelResult<String> {
        inference::infer_foreign_key(self)
    }

    /// Attribute on through-collection records that references the source
    pub fn through_foreign_key(&self) -> ModelResult<String> {
        inference::infer_through_foreign_key(self)
    }

    /// Additional scope applied to every resolved query
    pub fn selector(&self) -> Selector {
        self.selector.as_ref().map(|selector| selector()).unwrap_or_default()
    }

    /// Default options applied to every resolved query
    pub fn options(&self) -> FindOptions {
        self.options.as_ref().map(|options| options()).unwrap_or_default()
    }

    pub fn human_name(&self) -> &str {
        &self.human_name
    }

    pub fn human_name_singular(&self) -> &str {
        &self.human_name_singular
    }

    pub fn human_name_plural(&self) -> &str {
        &self.human_name_plural
    }

    /// Display name of the target collection
    pub fn human_collection_name(&self) -> ModelResult<String> {
        match &self.human_collection_name {
            Some(name) => Ok(name()),
            None => Ok(humanize(&self.collection_name()?)),
        }
    }

    /// Display name of a single record in the target collection
    pub fn human_collection_name_singular(&self) -> ModelResult<String> {
        match &self.human_collection_name_singular {
            Some(name) => Ok(name()),
            None => Ok(humanize(&singularize(&self.collection_name()?))),
        }
    }

    pub fn help_text(&self) -> String {
        self.help_text.as_ref().map(|text| text()).unwrap_or_default()
    }

    /// Whether the foreign key may be absent. Has-many relations are never required.
    pub fn optional(&self) -> bool {
        match &self.variant {
            RelationVariant::BelongsTo { optional, .. } => {
                optional.as_ref().map(|optional| optional()).unwrap_or(true)
            }
            RelationVariant::HasMany { .. } => true,
        }
    }

    pub fn required(&self) -> bool {
        !self.optional()
    }

    pub fn placeholder(&self) -> String {
        match &self.variant {
            RelationVariant::BelongsTo { placeholder, .. } => {
                placeholder.as_ref().map(|text| text()).unwrap_or_default()
            }
            RelationVariant::HasMany { .. } => String::new(),
        }
    }

    /// Identities a belongs-to relation may point to, if restricted
    pub fn allowed_ids(&self) -> Option<Vec<String>> {
        match &self.variant {
            RelationVariant::BelongsTo { allowed_ids, .. } => allowed_ids.as_ref().map(|ids| ids()),
            RelationVariant::HasMany { .. } => None,
        }
    }

    /// Advisory cascade flag; not enforced here
    pub fn nullify_foreign_relations(&self) -> bool {
        match &self.variant {
            RelationVariant::HasMany {
                nullify_foreign_relations,
            } => nullify_foreign_relations
                .as_ref()
                .map(|nullify| nullify())
                .unwrap_or(false),
            RelationVariant::BelongsTo { .. } => false,
        }
    }
}

impl fmt::Debug for RelationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("source", &self.source.model)
            .field("through", &self.through.is_some())
            .field("human_name", &self.human_name)
            .finish_non_exhaustive()
    }
}
