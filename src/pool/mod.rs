//! Repository pool keyed by schema-version-set equivalence.
//!
//! Lookups read an immutable snapshot of the cached entries without locking.
//! A miss enters the single creation section, re-checks the snapshot, then
//! consults the durable records before creating a new backend. New entries
//! are published by swapping in a new snapshot.

pub mod manager;
pub mod records;

use std::{
    collections::BTreeSet,
    fmt,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use arc_swap::ArcSwap;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use self::{
    manager::{DefaultConnector, ManagerConnector, RepositoryManager, RepositoryManagerConfig},
    records::RepositoryRecord,
};
use crate::{
    graph::{finish, Graph, MemoryStore, Pattern, QuadStore, StoreTransaction},
    management::ManagementStore,
    ontology::{value_objects::Iri, vocabulary, SchemaVersionSet},
    Error, Result,
};

/// Where newly created repositories go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    /// Directory of the local repository manager.
    pub home_directory: PathBuf,
    /// When set, new repositories are created on this remote service instead.
    pub remote_server_url: Option<String>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            home_directory: std::env::temp_dir().join("ontology-vault"),
            remote_server_url: None,
        }
    }
}

impl PoolSettings {
    fn manager_config(&self) -> RepositoryManagerConfig {
        match self.remote_server_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => RepositoryManagerConfig::Remote(url.to_string()),
            _ => RepositoryManagerConfig::Local(self.home_directory.clone()),
        }
    }
}

struct PoolEntry {
    schemas: SchemaVersionSet,
    repository: Iri,
    manager: Iri,
    id_in_manager: String,
    store: Arc<dyn QuadStore>,
}

/// Shared handle to a pooled backend.
#[derive(Clone)]
pub struct RepositoryHandle {
    entry: Arc<PoolEntry>,
}

impl RepositoryHandle {
    /// The schema versions the backend was built to serve.
    #[must_use]
    pub fn schemas(&self) -> &SchemaVersionSet {
        &self.entry.schemas
    }

    /// Durable repository IRI recorded in the management graph.
    #[must_use]
    pub fn repository_iri(&self) -> &Iri {
        &self.entry.repository
    }

    #[must_use]
    pub fn manager_iri(&self) -> &Iri {
        &self.entry.manager
    }

    #[must_use]
    pub fn id_in_manager(&self) -> &str {
        &self.entry.id_in_manager
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn QuadStore> {
        Arc::clone(&self.entry.store)
    }

    /// `true` when both handles share one pooled backend.
    #[must_use]
    pub fn same_backend(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }
}

impl fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("repository", &self.entry.repository)
            .field("manager", &self.entry.manager)
            .field("schemas", &self.entry.schemas)
            .finish()
    }
}

struct Resolution {
    entry: PoolEntry,
    created: bool,
}

/// Caches one backend per schema version set.
pub struct RepositoryPool {
    management: ManagementStore,
    entries: ArcSwap<Vec<Arc<PoolEntry>>>,
    create_lock: Mutex<()>,
    managers: DashMap<Iri, Arc<dyn RepositoryManager>>,
    connector: Arc<dyn ManagerConnector>,
    settings: PoolSettings,
    shut_down: AtomicBool,
}

impl RepositoryPool {
    pub fn new(management: ManagementStore, settings: PoolSettings) -> Self {
        Self::with_connector(management, settings, Arc::new(DefaultConnector))
    }

    pub fn with_connector(
        management: ManagementStore,
        settings: PoolSettings,
        connector: Arc<dyn ManagerConnector>,
    ) -> Self {
        Self {
            management,
            entries: ArcSwap::from_pointee(Vec::new()),
            create_lock: Mutex::new(()),
            managers: DashMap::new(),
            connector,
            settings,
            shut_down: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn management(&self) -> &ManagementStore {
        &self.management
    }

    /// Handles currently cached by the pool.
    #[must_use]
    pub fn cached(&self) -> Vec<RepositoryHandle> {
        self.entries
            .load()
            .iter()
            .map(|entry| RepositoryHandle {
                entry: Arc::clone(entry),
            })
            .collect()
    }

    /// A fresh in-memory store that the pool does not track.
    #[must_use]
    pub fn new_temporary_store(&self) -> Arc<dyn QuadStore> {
        let name = format!("temporary-{}", uuid::Uuid::new_v4());
        tracing::debug!(store = %name, "pool_temporary_store_created");
        Arc::new(MemoryStore::named(name))
    }

    fn ensure_running(&self) -> Result<()> {
        if self.shut_down.load(Ordering::Acquire) {
            Err(Error::PoolShutDown)
        } else {
            Ok(())
        }
    }

    fn lookup(&self, schemas: &SchemaVersionSet) -> Option<RepositoryHandle> {
        self.entries
            .load()
            .iter()
            .find(|entry| entry.schemas.is_equivalent(schemas))
            .map(|entry| RepositoryHandle {
                entry: Arc::clone(entry),
            })
    }

    /// Returns the backend serving exactly `schemas`, creating it on first use.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptySchemaSet`] for an empty set.
    /// - [`Error::MalformedIdentity`] when a member has no version.
    /// - [`Error::DuplicateRepositoryManager`] when several durable records
    ///   match.
    /// - [`Error::PoolShutDown`] after [`RepositoryPool::shutdown`].
    /// - Backend and store failures, after rolling back the bookkeeping.
    pub async fn acquire(&self, schemas: &SchemaVersionSet) -> Result<RepositoryHandle> {
        self.ensure_running()?;
        if schemas.is_empty() {
            return Err(Error::EmptySchemaSet);
        }
        for schema in schemas {
            schema.require_version()?;
        }

        if let Some(handle) = self.lookup(schemas) {
            return Ok(handle);
        }

        let _guard = self.create_lock.lock().await;
        self.ensure_running()?;
        if let Some(handle) = self.lookup(schemas) {
            return Ok(handle);
        }

        let resolution = self.resolve(schemas).await?;
        Ok(self.publish(resolution).await)
    }

    async fn resolve(&self, schemas: &SchemaVersionSet) -> Result<Resolution> {
        let known: BTreeSet<Iri> = self.managers.iter().map(|m| m.key().clone()).collect();
        let mut tx = self.management.begin().await?;
        let outcome = self.resolve_in(tx.as_mut(), schemas).await;
        let created = match &outcome {
            Ok(resolution) if resolution.created => Some((
                resolution.entry.manager.clone(),
                resolution.entry.id_in_manager.clone(),
            )),
            _ => None,
        };
        match finish(tx, outcome).await {
            Ok(resolution) => Ok(resolution),
            Err(error) => {
                if let Some((manager, id)) = created {
                    self.remove_backend(&manager, &id).await;
                }
                self.forget_managers(&known).await;
                Err(error)
            }
        }
    }

    async fn resolve_in(
        &self,
        tx: &mut dyn StoreTransaction,
        schemas: &SchemaVersionSet,
    ) -> Result<Resolution> {
        let context = self.management.graphs().repository.clone();
        let graph = tx.export(&Pattern::in_context(&context)).await?;

        let matches = records::exact_matches(&graph, schemas);
        if matches.len() > 1 {
            return Err(Error::duplicate_records(describe(schemas), matches.len()));
        }
        if let Some(record) = matches.into_iter().next() {
            return self.open_recorded(&graph, record, schemas).await;
        }

        let (manager_iri, manager) = self.configured_manager(tx, &graph, &context).await?;
        let repository = Iri::with_prefix(
            vocabulary::REPOSITORY_URN_PREFIX,
            &uuid::Uuid::new_v4().to_string(),
        )?;
        let id = manager.new_repository_id(repository.as_str()).await?;
        let store = manager.create_repository(&id).await?;

        let populated = async {
            self.copy_schemas(&*tx, &*store, schemas).await?;
            tx.add_all(records::repository_statements(
                &repository,
                &manager_iri,
                &id,
                schemas,
                Utc::now(),
                &context,
            ))
            .await?;
            Ok::<(), Error>(())
        }
        .await;
        if let Err(error) = populated {
            self.remove_backend(&manager_iri, &id).await;
            return Err(error);
        }

        tracing::info!(
            repository = %repository,
            manager = %manager_iri,
            id_in_manager = %id,
            schemas = schemas.len(),
            "pool_repository_created"
        );
        Ok(Resolution {
            entry: PoolEntry {
                schemas: schemas.clone(),
                repository,
                manager: manager_iri,
                id_in_manager: id,
                store,
            },
            created: true,
        })
    }

    async fn open_recorded(
        &self,
        graph: &Graph,
        record: RepositoryRecord,
        schemas: &SchemaVersionSet,
    ) -> Result<Resolution> {
        let missing = || Error::MissingRepository {
            manager: record.manager.clone(),
            repository: record.repository.to_string(),
        };
        let id = record.id_in_manager.clone().ok_or_else(missing)?;
        let manager = self.manager_for(graph, &record.manager).await?;
        let store = manager.open_repository(&id).await?.ok_or_else(missing)?;

        tracing::debug!(repository = %record.repository, "pool_repository_reopened");
        Ok(Resolution {
            entry: PoolEntry {
                schemas: schemas.clone(),
                repository: record.repository,
                manager: record.manager,
                id_in_manager: id,
                store,
            },
            created: false,
        })
    }

    async fn manager_for(
        &self,
        graph: &Graph,
        manager: &Iri,
    ) -> Result<Arc<dyn RepositoryManager>> {
        if let Some(existing) = self.managers.get(manager) {
            return Ok(Arc::clone(existing.value()));
        }
        let config = records::manager_config(graph, manager)?;
        let connected = self.connector.connect(&config).await?;
        self.managers.insert(manager.clone(), Arc::clone(&connected));
        Ok(connected)
    }

    /// Reuses the manager recorded for the configured backend, or records a
    /// new one inside `tx`. A new manager is cached right away so a failed
    /// creation can still remove its repository; [`RepositoryPool::resolve`]
    /// evicts it again when the transaction does not commit.
    async fn configured_manager(
        &self,
        tx: &mut dyn StoreTransaction,
        graph: &Graph,
        context: &Iri,
    ) -> Result<(Iri, Arc<dyn RepositoryManager>)> {
        let config = self.settings.manager_config();
        let recorded = records::managers_with(graph, &config);
        if recorded.len() > 1 {
            return Err(Error::duplicate_records(config.to_string(), recorded.len()));
        }
        if let Some(manager) = recorded.into_iter().next() {
            let connected = self.manager_for(graph, &manager).await?;
            return Ok((manager, connected));
        }

        let manager = Iri::with_prefix(
            vocabulary::REPOSITORY_MANAGER_URN_PREFIX,
            &uuid::Uuid::new_v4().to_string(),
        )?;
        let connected = self.connector.connect(&config).await?;
        tx.add_all(records::manager_statements(&manager, &config, context))
            .await?;
        self.managers.insert(manager.clone(), Arc::clone(&connected));
        tracing::info!(manager = %manager, backend = %config, "pool_repository_manager_created");
        Ok((manager, connected))
    }

    /// Copies the base and inferred content of every schema version from the
    /// management store into `target`.
    async fn copy_schemas(
        &self,
        source: &dyn StoreTransaction,
        target: &dyn QuadStore,
        schemas: &SchemaVersionSet,
    ) -> Result<()> {
        let schema_context = self.management.graphs().schema.clone();
        let mut target_tx = target.begin().await?;
        let outcome = async {
            for schema in schemas {
                let (_, version) = schema.require_version()?;
                let mut contexts = vec![version.clone()];
                contexts.extend(
                    source
                        .object_iris(
                            &Pattern::in_context(&schema_context)
                                .subject(version)
                                .predicate(vocabulary::inferred_version()),
                        )
                        .await?,
                );
                contexts.extend(schema.inferred_iri().cloned());
                contexts.dedup();

                for context in &contexts {
                    let statements = source.statements(&Pattern::in_context(context)).await?;
                    target_tx.add_all(statements).await?;
                }
            }
            Ok::<(), Error>(())
        }
        .await;
        finish(target_tx, outcome).await
    }

    /// Drops and shuts down every cached manager not in `known`.
    async fn forget_managers(&self, known: &BTreeSet<Iri>) {
        let added: Vec<Iri> = self
            .managers
            .iter()
            .map(|m| m.key().clone())
            .filter(|manager| !known.contains(manager))
            .collect();
        for manager in added {
            let Some((_, owner)) = self.managers.remove(&manager) else {
                continue;
            };
            if let Err(error) = owner.shutdown().await {
                tracing::warn!(
                    err.msg = %error,
                    err.detail = ?error,
                    manager = %manager,
                    "pool_repository_manager_shutdown_failed"
                );
            }
            tracing::debug!(manager = %manager, "pool_repository_manager_forgotten");
        }
    }

    async fn remove_backend(&self, manager: &Iri, id: &str) {
        let Some(owner) = self.managers.get(manager).map(|m| Arc::clone(m.value())) else {
            tracing::error!(manager = %manager, repository = id, "pool_orphaned_repository");
            return;
        };
        if let Err(error) = owner.remove_repository(id).await {
            tracing::error!(
                err.msg = %error,
                err.detail = ?error,
                manager = %manager,
                repository = id,
                "pool_orphaned_repository"
            );
        }
    }

    async fn publish(&self, resolution: Resolution) -> RepositoryHandle {
        let current = self.entries.load_full();
        if let Some(existing) = current
            .iter()
            .find(|entry| entry.schemas.is_equivalent(&resolution.entry.schemas))
        {
            tracing::error!(
                kept = %existing.repository,
                discarded = %resolution.entry.repository,
                "pool_duplicate_repository_discarded"
            );
            if resolution.created && existing.repository != resolution.entry.repository {
                self.discard(&resolution.entry).await;
            }
            return RepositoryHandle {
                entry: Arc::clone(existing),
            };
        }

        let entry = Arc::new(resolution.entry);
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(Arc::clone(&entry));
        self.entries.store(Arc::new(next));
        RepositoryHandle { entry }
    }

    /// Erases the durable record and backend of a duplicate entry.
    async fn discard(&self, entry: &PoolEntry) {
        let context = self.management.graphs().repository.clone();
        let erased = async {
            let mut tx = self.management.begin().await?;
            let outcome = async {
                let removal =
                    records::repository_removal(&entry.repository, &entry.manager, &context);
                for pattern in removal {
                    tx.remove(&pattern).await?;
                }
                Ok::<(), Error>(())
            }
            .await;
            finish(tx, outcome).await
        }
        .await;
        if let Err(error) = erased {
            tracing::error!(
                err.msg = %error,
                err.detail = ?error,
                repository = %entry.repository,
                "pool_orphaned_repository_record"
            );
        }
        if let Err(error) = entry.store.shutdown().await {
            tracing::warn!(
                err.msg = %error,
                repository = %entry.repository,
                "pool_discarded_store_shutdown_failed"
            );
        }
        self.remove_backend(&entry.manager, &entry.id_in_manager).await;
    }

    /// Stops the management store, every pooled backend and every manager.
    ///
    /// All failures are collected into [`Error::Shutdown`]. The pool rejects
    /// every later request with [`Error::PoolShutDown`].
    ///
    /// # Errors
    ///
    /// [`Error::Shutdown`] listing every teardown failure.
    pub async fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let _guard = self.create_lock.lock().await;
        let mut failures = Vec::new();

        if let Err(error) = self.management.store().shutdown().await {
            tracing::error!(
                err.msg = %error,
                err.detail = ?error,
                "pool_management_shutdown_failed"
            );
            failures.push(Error::from(error));
        }

        let entries = self.entries.swap(Arc::new(Vec::new()));
        for entry in entries.iter() {
            if let Err(error) = entry.store.shutdown().await {
                tracing::error!(
                    err.msg = %error,
                    err.detail = ?error,
                    repository = %entry.repository,
                    "pool_repository_shutdown_failed"
                );
                failures.push(Error::from(error));
            }
        }

        let managers: Vec<(Iri, Arc<dyn RepositoryManager>)> = self
            .managers
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        self.managers.clear();
        for (iri, manager) in managers {
            if let Err(error) = manager.shutdown().await {
                tracing::error!(
                    err.msg = %error,
                    err.detail = ?error,
                    manager = %iri,
                    "pool_manager_shutdown_failed"
                );
                failures.push(error);
            }
        }

        tracing::info!(failures = failures.len(), "pool_shutdown");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Shutdown { failures })
        }
    }
}

fn describe(schemas: &SchemaVersionSet) -> String {
    schemas
        .version_iris()
        .iter()
        .map(|iri| iri.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
