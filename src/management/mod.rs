//! Management graph store.
//!
//! A single transactional store holds the bookkeeping statements of the vault
//! in dedicated contexts: artifact versions, schema versions, repository
//! records and data repositories. Schema and artifact content lives in the
//! same store under the context named by each version (or inferred) IRI.

pub mod versions;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    graph::{finish, Graph, Pattern, QuadStore, Statement, StoreTransaction},
    ontology::{codec, value_objects::Iri, vocabulary, VersionedOntologyId},
    Error, Result,
};
pub use versions::{advance_version, VersionLinkPolicy};

/// Contexts reserved for bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementGraphs {
    pub artifact: Iri,
    pub schema: Iri,
    pub repository: Iri,
    pub data_repository: Iri,
}

impl Default for ManagementGraphs {
    fn default() -> Self {
        Self {
            artifact: vocabulary::term(vocabulary::DEFAULT_ARTIFACT_MANAGEMENT_GRAPH),
            schema: vocabulary::term(vocabulary::DEFAULT_SCHEMA_MANAGEMENT_GRAPH),
            repository: vocabulary::term(vocabulary::DEFAULT_REPOSITORY_MANAGEMENT_GRAPH),
            data_repository: vocabulary::term(
                vocabulary::DEFAULT_DATA_REPOSITORY_MANAGEMENT_GRAPH,
            ),
        }
    }
}

impl ManagementGraphs {
    #[must_use]
    pub fn is_management_context(&self, context: &Iri) -> bool {
        [
            &self.artifact,
            &self.schema,
            &self.repository,
            &self.data_repository,
        ]
        .contains(&context)
    }

    /// Returns `true` when `contexts` is non-empty and names no bookkeeping
    /// context, so dataset content may be written or cleared there.
    #[must_use]
    pub fn safe_contexts(&self, contexts: &[Iri]) -> bool {
        !contexts.is_empty()
            && contexts
                .iter()
                .all(|context| !self.is_management_context(context))
    }

    /// Fails with [`Error::MalformedIdentity`] unless `contexts` may hold
    /// ontology content.
    pub(crate) fn ensure_content_contexts(&self, contexts: &[Iri]) -> Result<()> {
        if self.safe_contexts(contexts) {
            return Ok(());
        }
        let names: Vec<String> = contexts.iter().map(ToString::to_string).collect();
        Err(Error::malformed(format!(
            "[{}] cannot hold ontology content: management contexts are reserved",
            names.join(", ")
        )))
    }
}

/// Bookkeeping operations over the management store.
#[derive(Clone)]
pub struct ManagementStore {
    store: Arc<dyn QuadStore>,
    graphs: ManagementGraphs,
}

impl ManagementStore {
    pub fn new(store: Arc<dyn QuadStore>, graphs: ManagementGraphs) -> Self {
        Self { store, graphs }
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn QuadStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn graphs(&self) -> &ManagementGraphs {
        &self.graphs
    }

    /// Starts a transaction on the management store.
    ///
    /// # Errors
    ///
    /// [`Error::StoreTransaction`] when the store refuses the transaction.
    pub async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(self.store.begin().await?)
    }

    /// Registers a new artifact version, keeping a single version link.
    ///
    /// # Errors
    ///
    /// Propagates identity and store failures after rolling back.
    pub async fn update_artifact_version(
        &self,
        ontology_id: &VersionedOntologyId,
        inferred_id: &VersionedOntologyId,
        update_current: bool,
    ) -> Result<()> {
        self.update_version(
            ontology_id,
            inferred_id,
            update_current,
            &self.graphs.artifact,
            VersionLinkPolicy::Replace,
        )
        .await
    }

    /// Registers a new schema version, keeping every earlier version link.
    ///
    /// # Errors
    ///
    /// Propagates identity and store failures after rolling back.
    pub async fn update_schema_version(
        &self,
        ontology_id: &VersionedOntologyId,
        inferred_id: &VersionedOntologyId,
        update_current: bool,
    ) -> Result<()> {
        self.update_version(
            ontology_id,
            inferred_id,
            update_current,
            &self.graphs.schema,
            VersionLinkPolicy::Accumulate,
        )
        .await
    }

    async fn update_version(
        &self,
        ontology_id: &VersionedOntologyId,
        inferred_id: &VersionedOntologyId,
        update_current: bool,
        context: &Iri,
        policy: VersionLinkPolicy,
    ) -> Result<()> {
        let mut tx = self.begin().await?;
        let outcome = advance_version(
            tx.as_mut(),
            ontology_id,
            inferred_id,
            update_current,
            context,
            policy,
        )
        .await;
        finish(tx, outcome).await?;
        tracing::info!(
            ontology = %ontology_id,
            context = %context,
            update_current,
            "management_version_advanced"
        );
        Ok(())
    }

    async fn context_graph(&self, context: &Iri) -> Result<Graph> {
        Ok(self.store.export(&Pattern::in_context(context)).await?)
    }

    /// Current version of the ontology named by `iri`, which may be either an
    /// ontology IRI or one of its version IRIs.
    ///
    /// # Errors
    ///
    /// [`Error::UnmanagedOntology`] when nothing in `context` matches `iri`.
    pub async fn current_version(&self, iri: &Iri, context: &Iri) -> Result<VersionedOntologyId> {
        let graph = self.context_graph(context).await?;
        current_in(&graph, iri).ok_or_else(|| Error::UnmanagedOntology(iri.clone()))
    }

    pub async fn current_artifact_version(&self, iri: &Iri) -> Result<VersionedOntologyId> {
        self.current_version(iri, &self.graphs.artifact).await
    }

    pub async fn current_schema_version(&self, iri: &Iri) -> Result<VersionedOntologyId> {
        self.current_version(iri, &self.graphs.schema).await
    }

    /// Every recorded version of an ontology, the current version first.
    ///
    /// # Errors
    ///
    /// [`Error::StoreTransaction`] when the store cannot be read.
    pub async fn all_versions(&self, iri: &Iri, context: &Iri) -> Result<Vec<VersionedOntologyId>> {
        let graph = self.context_graph(context).await?;
        let Some(ontology) = resolve_ontology(&graph, iri) else {
            return Ok(Vec::new());
        };
        let current = graph.object_iris(
            &Pattern::any()
                .subject(&ontology)
                .predicate(vocabulary::current_version()),
        );

        let mut versions: Vec<VersionedOntologyId> = codec::decode(&graph)
            .into_iter()
            .filter(|id| id.ontology_iri() == Some(&ontology))
            .collect();
        versions.sort_by_key(|id| {
            let is_current = id.version_iri().map_or(false, |v| current.contains(v));
            (!is_current, id.version_iri().cloned())
        });
        Ok(versions)
    }

    /// Every schema version recorded in the schema management context.
    pub async fn schema_ontologies(&self) -> Result<Vec<VersionedOntologyId>> {
        Ok(codec::decode(&self.context_graph(&self.graphs.schema).await?))
    }

    /// The current version of every managed schema ontology.
    pub async fn current_schema_ontologies(&self) -> Result<Vec<VersionedOntologyId>> {
        let graph = self.context_graph(&self.graphs.schema).await?;
        let ontologies =
            graph.subject_iris(&Pattern::any().predicate(vocabulary::current_version()));
        Ok(ontologies
            .iter()
            .filter_map(|ontology| current_in(&graph, ontology))
            .collect())
    }

    /// Removes the given versions from `context` together with their content
    /// contexts, moving the current pointer to a remaining version when the
    /// current one goes.
    ///
    /// # Errors
    ///
    /// Identity and store failures, after rolling back.
    pub async fn delete_ontologies(
        &self,
        ids: &[VersionedOntologyId],
        context: &Iri,
    ) -> Result<()> {
        let mut tx = self.begin().await?;
        let outcome = delete_in(tx.as_mut(), &self.graphs, ids, context).await;
        finish(tx, outcome).await?;
        tracing::info!(count = ids.len(), context = %context, "management_ontologies_deleted");
        Ok(())
    }

    /// Marks the current version of the ontology named by `iri` as published
    /// and returns that version.
    ///
    /// # Errors
    ///
    /// [`Error::UnmanagedOntology`] when nothing in `context` matches `iri`.
    pub async fn set_published(&self, iri: &Iri, context: &Iri) -> Result<VersionedOntologyId> {
        let mut tx = self.begin().await?;
        let outcome = async {
            let graph = tx.export(&Pattern::in_context(context)).await?;
            let current =
                current_in(&graph, iri).ok_or_else(|| Error::UnmanagedOntology(iri.clone()))?;
            let (_, version) = current.require_version()?;
            tx.remove(
                &Pattern::in_context(context)
                    .subject(version)
                    .predicate(vocabulary::has_publication_status()),
            )
            .await?;
            tx.add(Statement::new(
                version,
                vocabulary::has_publication_status(),
                vocabulary::term(vocabulary::PUBLISHED),
                Some(context.clone()),
            ))
            .await?;
            Ok::<_, Error>(current)
        }
        .await;
        let published = finish(tx, outcome).await?;
        tracing::info!(ontology = %published, context = %context, "management_version_published");
        Ok(published)
    }

    /// Whether the version of `id` was published. An identity without a
    /// version asks about the current version of its ontology.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedIdentity`] for an anonymous identity, store failures.
    pub async fn is_published(&self, id: &VersionedOntologyId, context: &Iri) -> Result<bool> {
        let tx = self.begin().await?;
        let outcome: Result<bool> = async {
            let version = match (id.ontology_iri(), id.version_iri()) {
                (_, Some(version)) => version.clone(),
                (Some(ontology), None) => {
                    let graph = tx.export(&Pattern::in_context(context)).await?;
                    match current_in(&graph, ontology).and_then(|c| c.version_iri().cloned()) {
                        Some(version) => version,
                        None => return Ok(false),
                    }
                }
                (None, None) => {
                    return Err(Error::malformed("an anonymous ontology cannot be published"))
                }
            };
            Ok(tx
                .contains(
                    &Pattern::in_context(context)
                        .subject(&version)
                        .predicate(vocabulary::has_publication_status())
                        .object(vocabulary::term(vocabulary::PUBLISHED)),
                )
                .await?)
        }
        .await;
        finish(tx, outcome).await
    }
}

fn resolve_ontology(graph: &Graph, iri: &Iri) -> Option<Iri> {
    let typed = Pattern::any()
        .subject(iri)
        .predicate(vocabulary::rdf_type())
        .object(vocabulary::owl_ontology());
    let has_versions = Pattern::any()
        .subject(iri)
        .predicate(vocabulary::owl_version_iri());
    if graph.contains(&typed) && graph.contains(&has_versions) {
        return Some(iri.clone());
    }
    graph
        .subject_iris(
            &Pattern::any()
                .predicate(vocabulary::owl_version_iri())
                .object(iri),
        )
        .into_iter()
        .next()
}

fn current_in(graph: &Graph, iri: &Iri) -> Option<VersionedOntologyId> {
    let ontology = resolve_ontology(graph, iri)?;
    let version = graph
        .object_iris(
            &Pattern::any()
                .subject(&ontology)
                .predicate(vocabulary::current_version()),
        )
        .into_iter()
        .next()?;
    let inferred = graph
        .object_iris(
            &Pattern::any()
                .subject(&version)
                .predicate(vocabulary::inferred_version()),
        )
        .into_iter()
        .next();
    VersionedOntologyId::try_new(Some(ontology), Some(version), inferred).ok()
}

async fn delete_in(
    tx: &mut dyn StoreTransaction,
    graphs: &ManagementGraphs,
    ids: &[VersionedOntologyId],
    context: &Iri,
) -> Result<()> {
    for id in ids {
        let (ontology, version) = id.require_version()?;
        let about = |subject: &Iri, predicate: Iri| {
            Pattern::in_context(context)
                .subject(subject)
                .predicate(predicate)
        };

        let mut inferred = tx
            .object_iris(&about(version, vocabulary::inferred_version()))
            .await?;
        inferred.extend(id.inferred_iri().cloned());
        let mut cleared = vec![version.clone()];
        cleared.extend(inferred.iter().cloned());
        graphs.ensure_content_contexts(&cleared)?;

        tx.remove(&about(ontology, vocabulary::owl_version_iri()).object(version))
            .await?;
        tx.remove(&Pattern::in_context(context).subject(version))
            .await?;
        tx.remove(&Pattern::in_context(version)).await?;
        for old in &inferred {
            tx.remove(&Pattern::in_context(context).subject(old)).await?;
            tx.remove(&Pattern::in_context(old)).await?;
            tx.remove(&about(ontology, vocabulary::current_inferred_version()).object(old))
                .await?;
        }

        let was_current = tx
            .contains(&about(ontology, vocabulary::current_version()).object(version))
            .await?;
        if !was_current {
            continue;
        }
        tx.remove(&about(ontology, vocabulary::current_version()))
            .await?;
        tx.remove(&about(ontology, vocabulary::current_inferred_version()))
            .await?;

        let remaining = tx
            .object_iris(&about(ontology, vocabulary::owl_version_iri()))
            .await?;
        match remaining.last() {
            Some(next) => {
                tx.add(Statement::new(
                    ontology,
                    vocabulary::current_version(),
                    next,
                    Some(context.clone()),
                ))
                .await?;
                let next_inferred = tx
                    .object_iris(&about(next, vocabulary::inferred_version()))
                    .await?;
                if let Some(next_inferred) = next_inferred.first() {
                    tx.add(Statement::new(
                        ontology,
                        vocabulary::current_inferred_version(),
                        next_inferred,
                        Some(context.clone()),
                    ))
                    .await?;
                }
            }
            None => {
                tx.remove(&Pattern::in_context(context).subject(ontology))
                    .await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemoryStore;

    fn iri(text: &str) -> Iri {
        Iri::new(text).expect("valid iri")
    }

    fn management() -> ManagementStore {
        ManagementStore::new(Arc::new(MemoryStore::new()), ManagementGraphs::default())
    }

    fn version(n: u32) -> VersionedOntologyId {
        VersionedOntologyId::versioned(iri("urn:test:a"), iri(&format!("urn:test:a/{n}")))
    }

    fn inferred(n: u32) -> VersionedOntologyId {
        VersionedOntologyId::unversioned(iri(&format!("urn:test:a/{n}/inferred")))
    }

    #[test]
    fn management_contexts_are_unsafe() {
        let graphs = ManagementGraphs::default();
        assert!(!graphs.safe_contexts(&[]));
        assert!(!graphs.safe_contexts(&[graphs.schema.clone()]));
        assert!(!graphs.safe_contexts(&[iri("urn:test:data"), graphs.repository.clone()]));
        assert!(graphs.safe_contexts(&[iri("urn:test:data")]));
    }

    #[tokio::test]
    async fn current_version_accepts_ontology_or_version_iri() {
        let management = management();
        management
            .update_schema_version(&version(1), &inferred(1), true)
            .await
            .expect("update");

        let by_ontology = management
            .current_schema_version(&iri("urn:test:a"))
            .await
            .expect("by ontology");
        let by_version = management
            .current_schema_version(&iri("urn:test:a/1"))
            .await
            .expect("by version");

        assert_eq!(by_ontology, by_version);
        assert_eq!(by_ontology.inferred_iri(), Some(&iri("urn:test:a/1/inferred")));
    }

    #[tokio::test]
    async fn unknown_iri_is_unmanaged() {
        let err = management()
            .current_artifact_version(&iri("urn:test:unknown"))
            .await
            .expect_err("unmanaged");
        assert!(matches!(err, Error::UnmanagedOntology(_)));
    }

    #[tokio::test]
    async fn all_versions_lists_current_first() {
        let management = management();
        for n in 1..=3 {
            management
                .update_schema_version(&version(n), &inferred(n), n == 2)
                .await
                .expect("update");
        }

        let versions = management
            .all_versions(&iri("urn:test:a"), &management.graphs().schema.clone())
            .await
            .expect("versions");
        assert_eq!(versions.len(), 3);
        assert_eq!(versions[0].version_iri(), Some(&iri("urn:test:a/2")));
    }

    #[tokio::test]
    async fn deleting_current_version_repoints_current() {
        let management = management();
        for n in 1..=2 {
            management
                .update_schema_version(&version(n), &inferred(n), true)
                .await
                .expect("update");
        }
        let schema = management.graphs().schema.clone();

        management
            .delete_ontologies(&[version(2)], &schema)
            .await
            .expect("delete");

        let current = management
            .current_schema_version(&iri("urn:test:a"))
            .await
            .expect("current");
        assert_eq!(current.version_iri(), Some(&iri("urn:test:a/1")));
        assert_eq!(current.inferred_iri(), Some(&iri("urn:test:a/1/inferred")));
        assert_eq!(management.schema_ontologies().await.expect("schemas").len(), 1);

        management
            .delete_ontologies(&[version(1)], &schema)
            .await
            .expect("delete last");
        assert!(management.schema_ontologies().await.expect("schemas").is_empty());
        assert!(management
            .current_schema_ontologies()
            .await
            .expect("current")
            .is_empty());
    }
}
