//! Backends that own the physical repositories behind pooled handles.

use std::{
    fmt,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{
    graph::{MemoryStore, QuadStore, StoreError},
    Error, Result,
};

/// Backend selection recorded for every repository manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepositoryManagerConfig {
    /// Repositories live in subdirectories of a local directory.
    Local(PathBuf),
    /// Repositories are served by a remote service at this URL.
    Remote(String),
}

impl fmt::Display for RepositoryManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(directory) => write!(f, "local:{}", directory.display()),
            Self::Remote(url) => write!(f, "remote:{url}"),
        }
    }
}

/// Creates, opens and removes repositories inside one backend.
#[async_trait]
pub trait RepositoryManager: Send + Sync {
    fn config(&self) -> RepositoryManagerConfig;

    /// Derives an unused repository id from `base`.
    async fn new_repository_id(&self, base: &str) -> Result<String>;

    async fn create_repository(&self, id: &str) -> Result<Arc<dyn QuadStore>>;

    /// Returns `Ok(None)` when the manager holds no repository named `id`.
    async fn open_repository(&self, id: &str) -> Result<Option<Arc<dyn QuadStore>>>;

    /// Deletes a repository, returning `false` when it did not exist.
    async fn remove_repository(&self, id: &str) -> Result<bool>;

    async fn shutdown(&self) -> Result<()>;
}

/// Builds managers from their recorded configuration.
///
/// Remote services are outside this crate; callers that use them plug in a
/// connector that knows how to reach one.
#[async_trait]
pub trait ManagerConnector: Send + Sync {
    async fn connect(
        &self,
        config: &RepositoryManagerConfig,
    ) -> Result<Arc<dyn RepositoryManager>>;
}

/// Connects local managers and refuses remote ones.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConnector;

#[async_trait]
impl ManagerConnector for DefaultConnector {
    async fn connect(
        &self,
        config: &RepositoryManagerConfig,
    ) -> Result<Arc<dyn RepositoryManager>> {
        match config {
            RepositoryManagerConfig::Local(directory) => {
                Ok(Arc::new(LocalRepositoryManager::open(directory)?))
            }
            RepositoryManagerConfig::Remote(url) => Err(Error::RemoteUnavailable {
                url: url.clone(),
                reason: "no remote connector configured".to_string(),
            }),
        }
    }
}

/// Keeps one persistent [`MemoryStore`] per subdirectory.
pub struct LocalRepositoryManager {
    directory: PathBuf,
    repositories: DashMap<String, MemoryStore>,
    open: AtomicBool,
}

impl LocalRepositoryManager {
    /// Opens (creating if needed) the manager directory.
    ///
    /// # Errors
    ///
    /// [`Error::StoreTransaction`] when the directory cannot be created.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|source| StoreError::Io {
            path: directory.clone(),
            source,
        })?;
        tracing::debug!(directory = %directory.display(), "local_repository_manager_opened");
        Ok(Self {
            directory,
            repositories: DashMap::new(),
            open: AtomicBool::new(true),
        })
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::closed(&self.directory.display().to_string()).into())
        }
    }
}

fn sanitize(base: &str) -> String {
    let id: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let id = id.trim_matches('-');
    if id.is_empty() {
        "repository".to_string()
    } else {
        id.to_string()
    }
}

#[async_trait]
impl RepositoryManager for LocalRepositoryManager {
    fn config(&self) -> RepositoryManagerConfig {
        RepositoryManagerConfig::Local(self.directory.clone())
    }

    async fn new_repository_id(&self, base: &str) -> Result<String> {
        self.ensure_open()?;
        let base = sanitize(base);
        let mut candidate = base.clone();
        let mut suffix = 0;
        while self.repositories.contains_key(&candidate)
            || self.directory.join(&candidate).exists()
        {
            suffix += 1;
            candidate = format!("{base}-{suffix}");
        }
        Ok(candidate)
    }

    async fn create_repository(&self, id: &str) -> Result<Arc<dyn QuadStore>> {
        self.ensure_open()?;
        let store = MemoryStore::open_persistent(self.directory.join(id))?;
        self.repositories.insert(id.to_string(), store.clone());
        tracing::info!(
            repository = id,
            directory = %self.directory.display(),
            "local_repository_created"
        );
        Ok(Arc::new(store))
    }

    async fn open_repository(&self, id: &str) -> Result<Option<Arc<dyn QuadStore>>> {
        self.ensure_open()?;
        if let Some(store) = self.repositories.get(id) {
            return Ok(Some(Arc::new(store.value().clone())));
        }
        let path = self.directory.join(id);
        if !path.is_dir() {
            return Ok(None);
        }
        let store = MemoryStore::open_persistent(path)?;
        let store = self
            .repositories
            .entry(id.to_string())
            .or_insert(store)
            .value()
            .clone();
        Ok(Some(Arc::new(store)))
    }

    async fn remove_repository(&self, id: &str) -> Result<bool> {
        let removed = self.repositories.remove(id);
        if let Some((_, store)) = &removed {
            store.shutdown().await?;
        }
        let path = self.directory.join(id);
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(|source| StoreError::Io { path, source })?;
            return Ok(true);
        }
        Ok(removed.is_some())
    }

    async fn shutdown(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let stores: Vec<MemoryStore> = self
            .repositories
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.repositories.clear();

        let mut failures = Vec::new();
        for store in stores {
            if let Err(error) = store.shutdown().await {
                tracing::error!(
                    err.msg = %error,
                    err.detail = ?error,
                    store = store.name(),
                    "local_repository_shutdown_failed"
                );
                failures.push(Error::from(error));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Shutdown { failures })
        }
    }
}
