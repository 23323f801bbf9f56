//! Crate-wide error type.

use crate::{
    graph::StoreError,
    ontology::value_objects::{Iri, IriError},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A graph lacked an ontology/version pair where one was required.
    #[error("malformed ontology identity: {0}")]
    MalformedIdentity(String),

    #[error("a repository must serve at least one schema version")]
    EmptySchemaSet,

    /// More than one durable record matched a lookup that must be unique.
    #[error("{count} repository records match `{lookup}`")]
    DuplicateRepositoryManager { lookup: String, count: usize },

    #[error("unrecognized repository manager type `{kind}` for `{manager}`")]
    UnrecognizedRepositoryManagerType { manager: Iri, kind: String },

    /// A schema version imports something not loaded earlier in the batch.
    #[error("schema version `{version}` imports `{import}` which has not been loaded")]
    MissingImport { import: Iri, version: Iri },

    /// Wraps any failure of the underlying graph store.
    #[error("store transaction failed: {0}")]
    StoreTransaction(#[from] StoreError),

    #[error("ontology `{0}` is not managed")]
    UnmanagedOntology(Iri),

    #[error("repository `{repository}` is missing from manager `{manager}`")]
    MissingRepository { manager: Iri, repository: String },

    #[error("remote repository manager at `{url}` is unavailable: {reason}")]
    RemoteUnavailable { url: String, reason: String },

    #[error("repository pool has been shut down")]
    PoolShutDown,

    /// Every failure collected while tearing the pool down.
    #[error("{} failure(s) during shutdown: {}", .failures.len(), join(.failures))]
    Shutdown { failures: Vec<Error> },

    #[error("reasoner failed: {0}")]
    Reasoner(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to initialize logger: {0}")]
    Logger(String),

    #[error(transparent)]
    Iri(#[from] IriError),
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedIdentity(message.into())
    }

    pub(crate) fn duplicate_records(lookup: impl Into<String>, count: usize) -> Self {
        Self::DuplicateRepositoryManager {
            lookup: lookup.into(),
            count,
        }
    }

    pub(crate) fn missing_import(import: &Iri, version: &Iri) -> Self {
        Self::MissingImport {
            import: import.clone(),
            version: version.clone(),
        }
    }
}

fn join(failures: &[Error]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
