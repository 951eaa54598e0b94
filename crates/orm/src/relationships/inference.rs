//! Relation Inference - deriving foreign keys and display names from partial declarations
//!
//! Foreign keys are inferred on every call rather than at declaration time:
//! collection names are often unknown while model types are being defined.

use crate::error::{ModelError, ModelResult};
use crate::naming::{ensure_id_suffix, foreign_key_for_collection, humanize, pluralize, singularize};

use super::metadata::{RelationDescription, RelationDescriptor, RelationKind, StringFn};

/// Display names derived for a relation
#[derive(Debug, Clone, PartialEq)]
pub struct HumanNames {
    pub human_name: String,
    pub singular: String,
    pub plural: String,
}

/// Derive display names.
///
/// Has-many relation names are plural by convention and belongs-to names are
/// singular, so the human name fills the matching slot and the other one is
/// inflected from it.
pub fn human_names(name: &str, kind: RelationKind, description: &RelationDescription) -> HumanNames {
    let human_name = description
        .human_name
        .clone()
        .unwrap_or_else(|| humanize(name));

    let (singular, plural) = match kind {
        RelationKind::HasMany => (singularize(&human_name), human_name.clone()),
        RelationKind::BelongsTo => (human_name.clone(), pluralize(&human_name)),
    };

    HumanNames {
        singular: description.human_name_singular.clone().unwrap_or(singular),
        plural: description.human_name_plural.clone().unwrap_or(plural),
        human_name,
    }
}

fn declared(accessor: &Option<StringFn>) -> Option<String> {
    accessor
        .as_ref()
        .map(|accessor| accessor())
        .filter(|value| !value.is_empty())
}

/// Infer the foreign key attribute of a relation.
///
/// Fallback order: explicit declaration, through collection, then the source
/// collection for has-many or the relation name for belongs-to. A belongs-to
/// `owner` is therefore stored under `ownerId` whatever its target is called.
pub fn infer_foreign_key(descriptor: &RelationDescriptor) -> ModelResult<String> {
    if let Some(foreign_key) = declared(&descriptor.foreign_key) {
        return Ok(ensure_id_suffix(&foreign_key));
    }

    if let Some(through) = descriptor.through()? {
        if !through.name().is_empty() {
            return Ok(foreign_key_for_collection(through.name()));
        }
    }

    if descriptor.kind() == RelationKind::BelongsTo {
        if descriptor.name().is_empty() {
            return Err(ModelError::configuration(format!(
                "Cannot infer a foreign key for an unnamed belongs-to relation on '{}'",
                descriptor.source_model()
            )));
        }
        return Ok(ensure_id_suffix(descriptor.name()));
    }

    let collection_name = source_collection_name(descriptor)?;

    if collection_name.is_empty() {
        return Err(ModelError::configuration(format!(
            "Cannot infer a foreign key for relation '{}' on '{}': neither source, nor target, nor through collection has a name",
            descriptor.name(),
            descriptor.source_model()
        )));
    }

    Ok(foreign_key_for_collection(&collection_name))
}

/// Infer the attribute on through-collection records that references the source record
pub fn infer_through_foreign_key(descriptor: &RelationDescriptor) -> ModelResult<String> {
    if !descriptor.has_through() {
        return Err(ModelError::configuration(format!(
            "Relation '{}' on '{}' has no ‘through’ collection set",
            descriptor.name(),
            descriptor.source_model()
        )));
    }

    if let Some(foreign_key) = declared(&descriptor.through_foreign_key) {
        return Ok(ensure_id_suffix(&foreign_key));
    }

    match descriptor.through()? {
        Some(through) if !through.name().is_empty() => Ok(foreign_key_for_collection(through.name())),
        _ => Err(ModelError::configuration(format!(
            "{} relation must have a defined foreign key for ‘through’ collection",
            descriptor.human_name()
        ))),
    }
}

fn source_collection_name(descriptor: &RelationDescriptor) -> ModelResult<String> {
    let missing = || {
        ModelError::configuration(format!(
            "Source collection must be defined for has-many relation '{}'. Please add a collection to the '{}' model type.",
            descriptor.name(),
            descriptor.source_model()
        ))
    };

    let collection_fn = descriptor.source.collection.as_ref().ok_or_else(missing)?;
    let collection = collection_fn().ok_or_else(missing)?;
    Ok(collection.name().to_string())
}
