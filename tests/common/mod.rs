#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use ontology_vault::{
    graph::{Graph, MemoryStore, Pattern, QuadStore, Statement, StoreError, StoreTransaction},
    management::{ManagementGraphs, ManagementStore},
    ontology::vocabulary,
    Iri, VersionedOntologyId,
};

pub fn iri(text: &str) -> Iri {
    Iri::new(text).expect("valid iri")
}

pub fn versioned(ontology: &str, version: &str) -> VersionedOntologyId {
    VersionedOntologyId::versioned(iri(ontology), iri(version))
}

pub fn temp_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("vault-{label}-{}", uuid::Uuid::new_v4()))
}

pub fn management() -> (MemoryStore, ManagementStore) {
    let store = MemoryStore::named("management");
    let management = ManagementStore::new(Arc::new(store.clone()), ManagementGraphs::default());
    (store, management)
}

/// Where a [`FailingStore`] injects its failure.
#[derive(Clone, Debug)]
pub enum FailPoint {
    /// Any removal whose pattern names this predicate.
    Remove(Iri),
    Commit,
}

/// Wraps a memory store and fails one kind of operation while armed.
#[derive(Clone)]
pub struct FailingStore {
    inner: MemoryStore,
    point: FailPoint,
    armed: Arc<AtomicBool>,
}

impl FailingStore {
    pub fn new(inner: MemoryStore, point: FailPoint) -> Self {
        Self {
            inner,
            point,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

struct FailingTransaction {
    inner: Box<dyn StoreTransaction>,
    point: FailPoint,
    armed: Arc<AtomicBool>,
}

impl FailingTransaction {
    fn injected() -> StoreError {
        StoreError::Backend("injected failure".to_string())
    }
}

#[async_trait]
impl QuadStore for FailingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin().await?,
            point: self.point.clone(),
            armed: Arc::clone(&self.armed),
        }))
    }

    async fn statements(&self, pattern: &Pattern) -> Result<Vec<Statement>, StoreError> {
        self.inner.statements(pattern).await
    }

    async fn size(&self) -> Result<usize, StoreError> {
        self.inner.size().await
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl StoreTransaction for FailingTransaction {
    async fn add(&mut self, statement: Statement) -> Result<bool, StoreError> {
        self.inner.add(statement).await
    }

    async fn remove(&mut self, pattern: &Pattern) -> Result<usize, StoreError> {
        if let FailPoint::Remove(predicate) = &self.point {
            if self.armed.load(Ordering::SeqCst) && pattern.predicate.as_ref() == Some(predicate) {
                return Err(Self::injected());
            }
        }
        self.inner.remove(pattern).await
    }

    async fn statements(&self, pattern: &Pattern) -> Result<Vec<Statement>, StoreError> {
        self.inner.statements(pattern).await
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if matches!(self.point, FailPoint::Commit) && self.armed.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.inner.rollback().await
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }
}

/// Builds a manifest holding one schema version per `(ontology, version,
/// imports)` entry, each with a class declared in the version's context.
pub fn manifest(entries: &[(&str, &str, &[&str])]) -> Graph {
    let mut graph = Graph::new();
    for (ontology, version, imports) in entries {
        let ontology = iri(ontology);
        let version = iri(version);
        graph.insert(Statement::new(
            &ontology,
            vocabulary::rdf_type(),
            &vocabulary::owl_ontology(),
            Some(version.clone()),
        ));
        graph.insert(Statement::new(
            &ontology,
            vocabulary::owl_version_iri(),
            &version,
            Some(version.clone()),
        ));
        graph.insert(Statement::new(
            &iri(&format!("{}#Thing", version.as_str())),
            vocabulary::rdf_type(),
            &iri("http://www.w3.org/2002/07/owl#Class"),
            Some(version.clone()),
        ));
        for import in *imports {
            graph.insert(Statement::new(
                &version,
                vocabulary::owl_imports(),
                &iri(import),
                Some(version.clone()),
            ));
        }
    }
    graph
}
