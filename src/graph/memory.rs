use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    jsonl::{read_statements_from_path, write_statements_to_path, STATEMENTS_FILE},
    model::{Graph, Pattern, Statement},
    store::{QuadStore, StoreError, StoreTransaction},
};

/// Transactional store keeping the committed graph as an immutable snapshot.
///
/// Readers load the current snapshot without locking. A transaction holds the
/// single writer permit, edits a private copy and publishes it on commit. When
/// opened on a directory, every commit is persisted before it is published.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    data: ArcSwap<Graph>,
    writer: Arc<Mutex<()>>,
    open: AtomicBool,
    persistence: Option<PathBuf>,
}

impl Inner {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::closed(&self.name))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::named("memory")
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a volatile store labelled `name` in logs.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::build(name.into(), Graph::new(), None)
    }

    /// Opens a store persisted under `directory`, loading any committed state.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created or the statements file
    /// cannot be parsed.
    pub fn open_persistent(directory: impl AsRef<Path>) -> Result<Self, StoreError> {
        let directory = directory.as_ref();
        fs::create_dir_all(directory).map_err(|source| StoreError::Io {
            path: directory.to_path_buf(),
            source,
        })?;
        let file = directory.join(STATEMENTS_FILE);
        let graph = read_statements_from_path(&file)?;
        tracing::debug!(
            store = %directory.display(),
            statements = graph.len(),
            "memory_store_loaded"
        );
        Ok(Self::build(directory.display().to_string(), graph, Some(file)))
    }

    fn build(name: String, graph: Graph, persistence: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                data: ArcSwap::from_pointee(graph),
                writer: Arc::new(Mutex::new(())),
                open: AtomicBool::new(true),
                persistence,
            }),
        }
    }

    /// Returns the committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Graph> {
        self.inner.data.load_full()
    }
}

#[async_trait]
impl QuadStore for MemoryStore {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        self.inner.ensure_open()?;
        let permit = Arc::clone(&self.inner.writer).lock_owned().await;
        // the store may have been closed while waiting for the writer permit
        self.inner.ensure_open()?;
        let working = Graph::clone(&self.inner.data.load());
        Ok(Box::new(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            working: Some(working),
            permit: Some(permit),
        }))
    }

    async fn statements(&self, pattern: &Pattern) -> Result<Vec<Statement>, StoreError> {
        self.inner.ensure_open()?;
        Ok(self.inner.data.load().filter(pattern).cloned().collect())
    }

    async fn size(&self) -> Result<usize, StoreError> {
        self.inner.ensure_open()?;
        Ok(self.inner.data.load().len())
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        if self.inner.open.swap(false, Ordering::AcqRel) {
            tracing::debug!(store = %self.inner.name, "memory_store_shutdown");
        }
        Ok(())
    }
}

struct MemoryTransaction {
    inner: Arc<Inner>,
    working: Option<Graph>,
    permit: Option<OwnedMutexGuard<()>>,
}

impl MemoryTransaction {
    fn working(&self) -> Result<&Graph, StoreError> {
        self.working.as_ref().ok_or(StoreError::Finished)
    }

    fn working_mut(&mut self) -> Result<&mut Graph, StoreError> {
        self.working.as_mut().ok_or(StoreError::Finished)
    }

    fn release(&mut self) {
        self.working = None;
        self.permit = None;
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn add(&mut self, statement: Statement) -> Result<bool, StoreError> {
        Ok(self.working_mut()?.insert(statement))
    }

    async fn remove(&mut self, pattern: &Pattern) -> Result<usize, StoreError> {
        Ok(self.working_mut()?.remove_matching(pattern))
    }

    async fn statements(&self, pattern: &Pattern) -> Result<Vec<Statement>, StoreError> {
        Ok(self.working()?.filter(pattern).cloned().collect())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.inner.ensure_open()?;
        let Some(working) = self.working.take() else {
            return Err(StoreError::Finished);
        };
        if let Some(path) = &self.inner.persistence {
            if let Err(error) = write_statements_to_path(path, &working) {
                self.working = Some(working);
                return Err(error.into());
            }
        }
        self.inner.data.store(Arc::new(working));
        self.release();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if self.working.is_none() {
            return Err(StoreError::Finished);
        }
        self.release();
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.working.is_some()
    }
}
