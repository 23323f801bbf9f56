//! Ontology identity primitives.
//!
//! The module keeps only pure value objects and the codec that maps them to
//! and from statements; persistence lives in [`crate::management`] and
//! [`crate::pool`].

pub mod codec;
pub mod identity;
pub mod value_objects;
pub mod vocabulary;

pub use identity::{SchemaVersionSet, VersionedOntologyId};
pub use value_objects::{Iri, IriError};
