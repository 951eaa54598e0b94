//! # docrel-orm: Relations between document collections
//!
//! Declares typed, named relations (belongs-to, has-many and has-many-through)
//! between records of independent document collections, and resolves them
//! into selectors against the target collection at runtime.
//!
//! The crate does not talk to a database. Anything implementing [`Collection`]
//! can be a relation target; [`MemoryCollection`] is an in-process store.

pub mod catalog;
pub mod collection;
pub mod config;
pub mod document;
pub mod error;
pub mod memory;
pub mod model;
pub mod naming;
pub mod relationships;
pub mod schema;
pub mod selector;

// Re-export core traits and types
pub use catalog::*;
pub use collection::*;
pub use config::*;
pub use document::*;
pub use error::*;
pub use memory::*;
pub use model::*;
pub use naming::*;
pub use relationships::*;
pub use schema::*;
pub use selector::*;
