//! # Ontology Vault
//!
//! Versioned ontology bookkeeping over quad stores, a pool of repositories
//! keyed by the exact set of schema versions they serve, and a loader that
//! brings schema versions in dependency order into the management store.
//!
//! ```rust,no_run
//! use ontology_vault::{config::Config, context::VaultContext};
//!
//! # async fn run() -> ontology_vault::Result<()> {
//! let config = Config::from_path("config/vault.yaml")?;
//! ontology_vault::logger::init(&config.logger)?;
//! let vault = VaultContext::from_config(config)?;
//! let schemas = vault.management.current_schema_ontologies().await?;
//! let repository = vault.pool.acquire(&schemas.into()).await?;
//! println!("{}", repository.repository_iri());
//! vault.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod errors;
pub mod graph;
pub mod logger;
pub mod management;
pub mod ontology;
pub mod pool;
pub mod schema;

pub use errors::{Error, Result};
pub use ontology::{Iri, SchemaVersionSet, VersionedOntologyId};
