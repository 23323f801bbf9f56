use std::sync::Arc;

use serde::Serialize;

use super::reasoner::Reasoner;
use crate::{
    graph::{finish, Graph, Pattern, StoreTransaction},
    management::{advance_version, ManagementStore, VersionLinkPolicy},
    ontology::{codec, value_objects::Iri, vocabulary, SchemaVersionSet, VersionedOntologyId},
    Error, Result,
};

/// Outcome of a [`SchemaLoader::load_in_order`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Schema ontologies with a current version after the call.
    pub current_schemas: usize,
    /// Distinct schema versions tracked after the call.
    pub schema_versions: usize,
    /// Versions added by this call, with their inferred IRIs.
    pub loaded: Vec<VersionedOntologyId>,
    /// Versions of the order that were already present.
    pub skipped: Vec<VersionedOntologyId>,
}

/// A version visible to later entries of the same call.
struct Staged {
    id: VersionedOntologyId,
    content: Graph,
    inferred: Graph,
}

/// Loads schema versions in a caller-chosen order, all or nothing.
#[derive(Clone)]
pub struct SchemaLoader {
    management: ManagementStore,
    reasoner: Arc<dyn Reasoner>,
    inferred_prefix: String,
}

impl SchemaLoader {
    pub fn new(
        management: ManagementStore,
        reasoner: Arc<dyn Reasoner>,
        inferred_prefix: impl Into<String>,
    ) -> Self {
        Self {
            management,
            reasoner,
            inferred_prefix: inferred_prefix.into(),
        }
    }

    /// Loads every version of `order` from `manifest` in one transaction.
    ///
    /// A version's content is the manifest context named by its version IRI,
    /// or failing that, the statements about the version IRI itself. Every
    /// `owl:imports` of a version must name a version (or an ontology) loaded
    /// earlier in `order`. Versions already recorded are not loaded again.
    ///
    /// # Errors
    ///
    /// [`Error::MissingImport`] on the first unmet import, reasoner and store
    /// failures. Nothing from the call is committed in any of these cases.
    pub async fn load_in_order(
        &self,
        manifest: &Graph,
        order: &[VersionedOntologyId],
    ) -> Result<LoadReport> {
        let mut tx = self.management.begin().await?;
        let outcome = self.load_in(tx.as_mut(), manifest, order).await;
        let (loaded, skipped) = finish(tx, outcome).await?;

        let report = LoadReport {
            current_schemas: self.management.current_schema_ontologies().await?.len(),
            schema_versions: SchemaVersionSet::new(self.management.schema_ontologies().await?)
                .len(),
            loaded,
            skipped,
        };
        tracing::info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            current_schemas = report.current_schemas,
            schema_versions = report.schema_versions,
            "schema_batch_loaded"
        );
        Ok(report)
    }

    async fn load_in(
        &self,
        tx: &mut dyn StoreTransaction,
        manifest: &Graph,
        order: &[VersionedOntologyId],
    ) -> Result<(Vec<VersionedOntologyId>, Vec<VersionedOntologyId>)> {
        let graphs = self.management.graphs();
        let schema_context = graphs.schema.clone();
        let recorded = codec::decode(&tx.export(&Pattern::in_context(&schema_context)).await?);

        let mut staged: Vec<Staged> = Vec::new();
        let mut loaded = Vec::new();
        let mut skipped = Vec::new();

        for entry in order {
            let (ontology, version) = entry.require_version()?;
            let mut targets = vec![version.clone()];
            targets.extend(entry.inferred_iri().cloned());
            graphs.ensure_content_contexts(&targets)?;
            let content = version_content(manifest, version);

            let mut dependencies = Vec::new();
            for import in imports(manifest, &content, version) {
                let Some(dependency) = resolve_import(&staged, &import) else {
                    tracing::warn!(version = %version, import = %import, "schema_import_missing");
                    return Err(Error::missing_import(&import, version));
                };
                dependencies.push(dependency.content.clone());
                dependencies.push(dependency.inferred.clone());
            }

            if let Some(existing) = recorded.iter().find(|id| id.version_equivalent(entry)) {
                let content = tx.export(&Pattern::in_context(version)).await?.with_context(None);
                let inferred = match existing.inferred_iri() {
                    Some(inferred) => tx
                        .export(&Pattern::in_context(inferred))
                        .await?
                        .with_context(None),
                    None => Graph::new(),
                };
                tracing::debug!(version = %version, "schema_version_already_loaded");
                skipped.push(existing.clone());
                staged.push(Staged {
                    id: existing.clone(),
                    content,
                    inferred,
                });
                continue;
            }

            let inferred_iri = match entry.inferred_iri() {
                Some(inferred) => inferred.clone(),
                None => Iri::with_prefix(&self.inferred_prefix, version.as_str())?,
            };
            graphs.ensure_content_contexts(std::slice::from_ref(&inferred_iri))?;
            let inferred = self.reasoner.infer(&content, &dependencies).await?;

            tx.add_all(content.with_context(Some(version)).into_statements())
                .await?;
            tx.add_all(inferred.with_context(Some(&inferred_iri)).into_statements())
                .await?;

            let update_current = manifest.contains(
                &Pattern::any()
                    .subject(ontology)
                    .predicate(vocabulary::current_version())
                    .object(version),
            );
            let id = entry.without_inferred().with_inferred(inferred_iri.clone())?;
            advance_version(
                tx,
                &id,
                &VersionedOntologyId::unversioned(inferred_iri),
                update_current,
                &schema_context,
                VersionLinkPolicy::Accumulate,
            )
            .await?;

            tracing::debug!(
                version = %version,
                statements = content.len(),
                inferred = inferred.len(),
                "schema_version_staged"
            );
            loaded.push(id.clone());
            staged.push(Staged {
                id,
                content,
                inferred,
            });
        }

        Ok((loaded, skipped))
    }
}

fn version_content(manifest: &Graph, version: &Iri) -> Graph {
    let in_context: Graph = manifest
        .filter(&Pattern::in_context(version))
        .cloned()
        .collect();
    if !in_context.is_empty() {
        return in_context.with_context(None);
    }
    manifest
        .filter(&Pattern::any().subject(version))
        .cloned()
        .collect::<Graph>()
        .with_context(None)
}

fn imports(manifest: &Graph, content: &Graph, version: &Iri) -> Vec<Iri> {
    let pattern = Pattern::any()
        .subject(version)
        .predicate(vocabulary::owl_imports());
    let mut found = manifest.object_iris(&pattern);
    for import in content.object_iris(&pattern) {
        if !found.contains(&import) {
            found.push(import);
        }
    }
    found
}

/// Matches an import by version IRI, or by ontology IRI against the latest
/// staged version of that ontology.
fn resolve_import<'a>(staged: &'a [Staged], import: &Iri) -> Option<&'a Staged> {
    staged
        .iter()
        .find(|s| s.id.version_iri() == Some(import))
        .or_else(|| {
            staged
                .iter()
                .rev()
                .find(|s| s.id.ontology_iri() == Some(import))
        })
}
