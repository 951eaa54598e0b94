//! Relation Resolver - turns a descriptor plus a source document into a query
//!
//! Resolution never fails because data is missing. A source without a foreign
//! key value or without an identity resolves to [`ResolvedQuery::NoMatch`];
//! only configuration problems surface as errors.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::collection::{Collection, Cursor};
use crate::config::RelationConfig;
use crate::document::Document;
use crate::error::ModelResult;
use crate::selector::{FindOptions, Selector, ID_FIELD};

use super::metadata::{RelationDescriptor, RelationKind};

/// A fully built relation query, ready to run against its target collection
#[derive(Clone)]
pub enum ResolvedQuery {
    /// Nothing can be related; running it yields nothing without touching storage
    NoMatch,
    /// Single target lookup (belongs-to)
    FindOne {
        collection: Arc<dyn Collection>,
        selector: Selector,
        options: FindOptions,
    },
    /// Target set lookup (has-many, direct or through)
    Find {
        collection: Arc<dyn Collection>,
        selector: Selector,
        options: FindOptions,
    },
}

impl ResolvedQuery {
    /// The final selector, if a query would be issued
    pub fn selector(&self) -> Option<&Selector> {
        match self {
            Self::NoMatch => None,
            Self::FindOne { selector, .. } | Self::Find { selector, .. } => Some(selector),
        }
    }

    /// The merged options, if a query would be issued
    pub fn options(&self) -> Option<&FindOptions> {
        match self {
            Self::NoMatch => None,
            Self::FindOne { options, .. } | Self::Find { options, .. } => Some(options),
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch)
    }

    /// Run as a single-record lookup
    pub fn find_one(&self) -> ModelResult<Option<Document>> {
        match self {
            Self::NoMatch => Ok(None),
            Self::FindOne {
                collection,
                selector,
                options,
            }
            | Self::Find {
                collection,
                selector,
                options,
            } => collection.find_one(selector, options),
        }
    }

    /// Run as a multi-record lookup
    pub fn find(&self) -> ModelResult<Cursor> {
        match self {
            Self::NoMatch => Ok(Cursor::empty()),
            Self::FindOne {
                collection,
                selector,
                options,
            }
            | Self::Find {
                collection,
                selector,
                options,
            } => collection.find(selector, options),
        }
    }
}

impl fmt::Debug for ResolvedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch => write!(f, "NoMatch"),
            Self::FindOne {
                collection,
                selector,
                options,
            } => f
                .debug_struct("FindOne")
                .field("collection", &collection.name())
                .field("selector", selector)
                .field("options", options)
                .finish(),
            Self::Find {
                collection,
                selector,
                options,
            } => f
                .debug_struct("Find")
                .field("collection", &collection.name())
                .field("selector", selector)
                .field("options", options)
                .finish(),
        }
    }
}

/// Builds target queries for declared relations
#[derive(Debug, Clone, Default)]
pub struct RelationResolver {
    config: RelationConfig,
}

impl RelationResolver {
    pub fn new(config: &RelationConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Resolve a relation for one source document.
    ///
    /// `extra` options are laid over the descriptor's default options; keys the
    /// caller does not mention keep their defaults.
    pub fn resolve(
        &self,
        descriptor: &RelationDescriptor,
        source: &Document,
        extra: Option<FindOptions>,
    ) -> ModelResult<ResolvedQuery> {
        let query = match descriptor.kind() {
            RelationKind::BelongsTo => self.resolve_belongs_to(descriptor, source, extra)?,
            RelationKind::HasMany if descriptor.has_through() => {
                self.resolve_through(descriptor, source, extra)?
            }
            RelationKind::HasMany => self.resolve_has_many(descriptor, source, extra)?,
        };

        tracing::trace!(
            "Resolved {} relation '{}' on '{}': {:?}",
            descriptor.kind(),
            descriptor.name(),
            descriptor.source_model(),
            query
        );

        Ok(query)
    }

    fn resolve_belongs_to(
        &self,
        descriptor: &RelationDescriptor,
        source: &Document,
        extra: Option<FindOptions>,
    ) -> ModelResult<ResolvedQuery> {
        let foreign_key = descriptor.foreign_key()?;
        let Some(value) = self.foreign_key_value(source.get(&foreign_key)) else {
            return Ok(ResolvedQuery::NoMatch);
        };

        Ok(ResolvedQuery::FindOne {
            collection: descriptor.collection()?,
            selector: descriptor.selector().merge(Selector::by_id(value)),
            options: merged_options(descriptor, extra),
        })
    }

    fn resolve_has_many(
        &self,
        descriptor: &RelationDescriptor,
        source: &Document,
        extra: Option<FindOptions>,
    ) -> ModelResult<ResolvedQuery> {
        let Some(id) = source.id() else {
            return Ok(ResolvedQuery::NoMatch);
        };

        let foreign_key = descriptor.foreign_key()?;
        Ok(ResolvedQuery::Find {
            collection: descriptor.collection()?,
            selector: descriptor.selector().merge(Selector::new().eq(foreign_key, id)),
            options: merged_options(descriptor, extra),
        })
    }

    fn resolve_through(
        &self,
        descriptor: &RelationDescriptor,
        source: &Document,
        extra: Option<FindOptions>,
    ) -> ModelResult<ResolvedQuery> {
        // Configuration errors come before the data check
        let through_foreign_key = descriptor.through_foreign_key()?;
        let foreign_key = descriptor.foreign_key()?;

        let Some(id) = source.id() else {
            return Ok(ResolvedQuery::NoMatch);
        };

        let Some(through) = descriptor.through()? else {
            return self.resolve_has_many(descriptor, source, extra);
        };

        let ids = through
            .find(
                &Selector::new().eq(through_foreign_key, id),
                &FindOptions::new().fields([ID_FIELD]),
            )?
            .ids();

        if ids.is_empty() && self.config.short_circuit_empty_through {
            tracing::debug!(
                "No '{}' records reference '{}', skipping query for relation '{}'",
                through.name(),
                id,
                descriptor.name()
            );
            return Ok(ResolvedQuery::NoMatch);
        }

        Ok(ResolvedQuery::Find {
            collection: descriptor.collection()?,
            selector: descriptor.selector().merge(Selector::new().is_in(foreign_key, ids)),
            options: merged_options(descriptor, extra),
        })
    }

    /// Foreign key values are identities; only scalar values can reference a record
    pub fn foreign_key_value(&self, value: Option<&Value>) -> Option<String> {
        match value? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if self.config.coerce_foreign_keys => Some(n.to_string()),
            Value::Bool(b) if self.config.coerce_foreign_keys => Some(b.to_string()),
            _ => None,
        }
    }
}

fn merged_options(descriptor: &RelationDescriptor, extra: Option<FindOptions>) -> FindOptions {
    match extra {
        Some(extra) => descriptor.options().merge(extra),
        None => descriptor.options(),
    }
}
