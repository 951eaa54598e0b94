//! Error types for the relation engine
//!
//! Configuration mistakes (a foreign key that cannot be derived, a missing
//! collection) are errors. Missing data is not: a record without a foreign
//! key value or without an identity simply has no related records.

use thiserror::Error;

use crate::config::ConfigError;
use crate::relationships::RelationKind;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error types for relation declaration and resolution
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// A relation cannot determine a required derived value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An attribute passed to a document constructor shadows a relation
    #[error("{}", collision_message(.attribute, .kind))]
    AttributeCollision {
        attribute: String,
        kind: RelationKind,
    },

    /// A relation slot was read while its descriptor was still being built
    #[error("Relation '{relation}' on '{model}' must be initialized before use")]
    UninitializedRelation { model: String, relation: String },

    /// No relation with this name is declared on the model (or its ancestors)
    #[error("No {kind} relation named '{relation}' is defined on '{model}'")]
    RelationNotFound {
        model: String,
        relation: String,
        kind: RelationKind,
    },

    /// Failure reported by a collection implementation
    #[error("Collection error: {0}")]
    Collection(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid engine configuration
    #[error("Invalid relation config: {0}")]
    Config(String),
}

impl ModelError {
    /// Shorthand for a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ModelError::Configuration(message.into())
    }

    /// Returns true for errors caused by a programming mistake in relation setup
    pub fn is_configuration(&self) -> bool {
        matches!(self, ModelError::Configuration(_) | ModelError::Config(_))
    }
}

fn collision_message(attribute: &str, kind: &RelationKind) -> String {
    match kind {
        RelationKind::HasMany => format!(
            "Cannot construct Document: ‘{attribute}’ is no valid property. ‘{attribute}’ is already a defined has-many relation."
        ),
        RelationKind::BelongsTo => format!(
            "Cannot construct Document: ‘{attribute}’ is no valid property, as there is a belongs-to relation with the same name. Did you mean to use ‘{attribute}Id’?"
        ),
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> Self {
        ModelError::Config(err.to_string())
    }
}
