//! Relationships Module - declaration, inference, registry and resolution

pub mod belongs_to;
pub mod has_many;

pub mod inference;
pub mod metadata;
pub mod registry;
pub mod resolver;

// Re-export instance-bound accessors
pub use belongs_to::BelongsTo;
pub use has_many::HasMany;

// Re-export metadata system types
pub use inference::HumanNames;
pub use metadata::*;
pub use registry::{global_registry, RegistryStats, RelationRegistry, RelationSet};
pub use resolver::{RelationResolver, ResolvedQuery};
