//! Quad statements and the transactional store interface the vault is written
//! against.

pub mod jsonl;
pub mod memory;
pub mod model;
pub mod store;

pub use memory::MemoryStore;
pub use model::{Graph, Pattern, Resource, Statement, Value};
pub use store::{finish, QuadStore, StoreError, StoreTransaction};
