//! Schema loading and the reasoner collaborator it drives.

pub mod loader;
pub mod reasoner;

pub use loader::{LoadReport, SchemaLoader};
pub use reasoner::{HierarchyReasoner, Reasoner};
