use std::path::PathBuf;

use async_trait::async_trait;

use super::jsonl::JsonlError;
use super::model::{Graph, Pattern, Statement};
use crate::{ontology::value_objects::Iri, Error, Result};

/// Failures raised by graph store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store was shut down.
    #[error("store `{store}` is closed")]
    Closed { store: String },
    /// The transaction was already committed or rolled back.
    #[error("transaction is no longer active")]
    Finished,
    /// Accessing the store directory failed.
    #[error("store I/O failure at `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Persisting committed statements failed.
    #[error("failed to persist statements: {0}")]
    Persist(#[from] JsonlError),
    /// Backend specific failure.
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn closed(store: &str) -> Self {
        Self::Closed {
            store: store.to_string(),
        }
    }
}

/// Transactional quad store.
///
/// Both the management store and every pooled repository are reached only
/// through this contract, whether backed by memory, a local directory or a
/// remote service.
#[async_trait]
pub trait QuadStore: Send + Sync {
    /// Human readable identifier used in logs.
    fn name(&self) -> &str;

    /// Returns `false` once [`QuadStore::shutdown`] has completed.
    fn is_open(&self) -> bool;

    /// Starts a transaction.
    ///
    /// Implementors must keep staged changes invisible to other readers until
    /// [`StoreTransaction::commit`] and must serialize concurrent writers.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    /// Returns the committed statements matching `pattern`.
    async fn statements(&self, pattern: &Pattern) -> Result<Vec<Statement>, StoreError>;

    /// Collects the committed statements matching `pattern` into a graph.
    async fn export(&self, pattern: &Pattern) -> Result<Graph, StoreError> {
        Ok(self.statements(pattern).await?.into_iter().collect())
    }

    /// Number of committed statements.
    async fn size(&self) -> Result<usize, StoreError>;

    /// Closes the store. Later calls fail with [`StoreError::Closed`].
    async fn shutdown(&self) -> Result<(), StoreError>;
}

/// Unit of isolation for every multi-step bookkeeping mutation.
#[async_trait]
pub trait StoreTransaction: Send + Sync {
    /// Stages a statement, returning `false` when it is already present.
    async fn add(&mut self, statement: Statement) -> Result<bool, StoreError>;

    /// Stages a batch of statements, returning how many were new.
    async fn add_all(&mut self, statements: Vec<Statement>) -> Result<usize, StoreError> {
        let mut added = 0;
        for statement in statements {
            if self.add(statement).await? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Stages the removal of every statement matching `pattern`.
    async fn remove(&mut self, pattern: &Pattern) -> Result<usize, StoreError>;

    /// Reads through the transaction, staged changes included.
    async fn statements(&self, pattern: &Pattern) -> Result<Vec<Statement>, StoreError>;

    async fn export(&self, pattern: &Pattern) -> Result<Graph, StoreError> {
        Ok(self.statements(pattern).await?.into_iter().collect())
    }

    async fn contains(&self, pattern: &Pattern) -> Result<bool, StoreError> {
        Ok(!self.statements(pattern).await?.is_empty())
    }

    /// IRI objects of the matching statements, deduplicated.
    async fn object_iris(&self, pattern: &Pattern) -> Result<Vec<Iri>, StoreError> {
        Ok(self.export(pattern).await?.object_iris(&Pattern::any()))
    }

    /// Publishes the staged changes atomically.
    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Discards the staged changes.
    async fn rollback(&mut self) -> Result<(), StoreError>;

    /// `true` until the transaction is committed or rolled back.
    fn is_active(&self) -> bool;
}

/// Commits `tx` when `outcome` succeeded and rolls it back otherwise.
///
/// The transaction is consumed on every path, so a failed commit is followed
/// by a rollback before the error surfaces as [`Error::StoreTransaction`].
pub async fn finish<T: Send>(mut tx: Box<dyn StoreTransaction>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => match tx.commit().await {
            Ok(()) => Ok(value),
            Err(error) => {
                tracing::error!(err.msg = %error, err.detail = ?error, "transaction_commit_failed");
                release(tx).await;
                Err(Error::StoreTransaction(error))
            }
        },
        Err(error) => {
            tracing::debug!(err.msg = %error, "transaction_rolled_back");
            release(tx).await;
            Err(error)
        }
    }
}

async fn release(mut tx: Box<dyn StoreTransaction>) {
    if tx.is_active() {
        if let Err(error) = tx.rollback().await {
            tracing::error!(err.msg = %error, err.detail = ?error, "transaction_rollback_failed");
        }
    }
}
