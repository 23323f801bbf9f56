use std::sync::Arc;

use crate::{
    config::{Config, ManagementBackend, ReasonerBackend},
    graph::{MemoryStore, QuadStore},
    management::ManagementStore,
    pool::{manager::ManagerConnector, RepositoryPool},
    schema::{HierarchyReasoner, Reasoner, SchemaLoader},
    Result,
};

/// Wires the management store, repository pool and schema loader together.
#[derive(Clone)]
pub struct VaultContext {
    pub config: Config,
    pub management: ManagementStore,
    pub pool: Arc<RepositoryPool>,
    pub loader: SchemaLoader,
    pub reasoner: Arc<dyn Reasoner>,
}

impl VaultContext {
    /// Builds a context from configuration with the default manager connector.
    ///
    /// # Errors
    ///
    /// Fails when a local management directory cannot be opened.
    pub fn from_config(config: Config) -> Result<Self> {
        let management = management_store(&config)?;
        let pool = RepositoryPool::new(management.clone(), config.repositories.pool_settings());
        Ok(Self::assemble(config, management, pool))
    }

    /// Like [`VaultContext::from_config`], with a custom connector for remote
    /// repository managers.
    ///
    /// # Errors
    ///
    /// Fails when a local management directory cannot be opened.
    pub fn with_connector(config: Config, connector: Arc<dyn ManagerConnector>) -> Result<Self> {
        let management = management_store(&config)?;
        let pool = RepositoryPool::with_connector(
            management.clone(),
            config.repositories.pool_settings(),
            connector,
        );
        Ok(Self::assemble(config, management, pool))
    }

    fn assemble(config: Config, management: ManagementStore, pool: RepositoryPool) -> Self {
        let reasoner: Arc<dyn Reasoner> = match config.reasoner.backend {
            ReasonerBackend::Native => Arc::new(HierarchyReasoner::new(config.reasoner.clone())),
        };
        let loader = SchemaLoader::new(
            management.clone(),
            Arc::clone(&reasoner),
            config.repositories.inferred_prefix.clone(),
        );
        let store = management.store();
        tracing::info!(
            management = store.name(),
            graphs = ?management.graphs(),
            "vault_context_created"
        );
        Self {
            config,
            management,
            pool: Arc::new(pool),
            loader,
            reasoner,
        }
    }

    /// Shuts the pool down, which also closes the management store.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Shutdown`] listing every teardown failure.
    pub async fn shutdown(&self) -> Result<()> {
        self.pool.shutdown().await
    }
}

fn management_store(config: &Config) -> Result<ManagementStore> {
    let store: Arc<dyn QuadStore> = match &config.management {
        ManagementBackend::InMemory => Arc::new(MemoryStore::named("management")),
        ManagementBackend::Local { directory } => {
            Arc::new(MemoryStore::open_persistent(directory)?)
        }
    };
    Ok(ManagementStore::new(store, config.graphs.clone()))
}
