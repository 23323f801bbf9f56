//! Advancing the version pointers of one ontology.

use std::collections::BTreeSet;

use crate::{
    graph::{Pattern, Statement, StoreTransaction},
    ontology::{value_objects::Iri, vocabulary, VersionedOntologyId},
    Error, Result,
};

/// How `owl:versionIRI` links of an ontology evolve when a version is added.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionLinkPolicy {
    /// Keep a single version link; older links and their inferred graphs go.
    Replace,
    /// Keep every version link; only the inferred graph of the version being
    /// re-registered is superseded.
    Accumulate,
}

/// Records `ontology_id` as a version of its ontology inside `context` and
/// points the inferred-version bookkeeping at `inferred_id`.
///
/// The caller owns the transaction; every step is staged in `tx` so that a
/// failure anywhere leaves the committed state untouched once the caller rolls
/// back.
///
/// # Errors
///
/// [`Error::MalformedIdentity`] when either identity lacks the required IRIs,
/// [`Error::StoreTransaction`] for store failures.
pub async fn advance_version(
    tx: &mut dyn StoreTransaction,
    ontology_id: &VersionedOntologyId,
    inferred_id: &VersionedOntologyId,
    update_current: bool,
    context: &Iri,
    policy: VersionLinkPolicy,
) -> Result<()> {
    let (ontology, version) = ontology_id.require_version()?;
    let inferred = inferred_id.ontology_iri().ok_or_else(|| {
        Error::malformed(format!("inferred identity for `{ontology_id}` has no ontology IRI"))
    })?;
    let quad = |subject: &Iri, predicate: Iri, object: &Iri| {
        Statement::new(subject, predicate, object, Some(context.clone()))
    };
    let about = |subject: &Iri, predicate: Iri| {
        Pattern::in_context(context)
            .subject(subject)
            .predicate(predicate)
    };

    tx.add(quad(ontology, vocabulary::rdf_type(), &vocabulary::owl_ontology()))
        .await?;

    let previous_versions = tx
        .object_iris(&about(ontology, vocabulary::owl_version_iri()))
        .await?;
    if policy == VersionLinkPolicy::Replace {
        tx.remove(&about(ontology, vocabulary::owl_version_iri()))
            .await?;
    }
    tx.add(quad(ontology, vocabulary::owl_version_iri(), version))
        .await?;

    let has_current = tx
        .contains(&about(ontology, vocabulary::current_version()))
        .await?;
    if !has_current || update_current {
        tx.remove(&about(ontology, vocabulary::current_version()))
            .await?;
        tx.add(quad(ontology, vocabulary::current_version(), version))
            .await?;
    }

    tx.add(quad(inferred, vocabulary::rdf_type(), &vocabulary::owl_ontology()))
        .await?;

    let previous_current_inferred = tx
        .object_iris(&about(ontology, vocabulary::current_inferred_version()))
        .await?;
    tx.remove(&about(ontology, vocabulary::current_inferred_version()))
        .await?;
    tx.add(quad(ontology, vocabulary::current_inferred_version(), inferred))
        .await?;

    let mut owners: BTreeSet<Iri> = BTreeSet::from([version.clone()]);
    let mut stale: BTreeSet<Iri> = BTreeSet::new();
    if policy == VersionLinkPolicy::Replace {
        owners.extend(previous_versions);
        stale.extend(previous_current_inferred);
    }
    for owner in &owners {
        stale.extend(
            tx.object_iris(&about(owner, vocabulary::inferred_version()))
                .await?,
        );
    }
    stale.remove(inferred);
    for old in &stale {
        let removed = tx
            .remove(&Pattern::in_context(context).subject(old))
            .await?;
        tracing::debug!(inferred = %old, removed, "inferred_version_collected");
    }

    for owner in &owners {
        tx.remove(&about(owner, vocabulary::inferred_version()))
            .await?;
    }
    tx.add(quad(version, vocabulary::inferred_version(), inferred))
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{MemoryStore, QuadStore};

    fn iri(text: &str) -> Iri {
        Iri::new(text).expect("valid iri")
    }

    fn id(version: &str) -> VersionedOntologyId {
        VersionedOntologyId::versioned(iri("urn:test:a"), iri(version))
    }

    fn inferred(name: &str) -> VersionedOntologyId {
        VersionedOntologyId::unversioned(iri(name))
    }

    async fn advance(
        store: &MemoryStore,
        version: &str,
        inferred_name: &str,
        update_current: bool,
        policy: VersionLinkPolicy,
    ) {
        let mut tx = store.begin().await.expect("begin");
        advance_version(
            tx.as_mut(),
            &id(version),
            &inferred(inferred_name),
            update_current,
            &iri("urn:test:ctx"),
            policy,
        )
        .await
        .expect("advance");
        tx.commit().await.expect("commit");
    }

    fn objects(store: &MemoryStore, subject: &str, predicate: Iri) -> Vec<Iri> {
        store
            .snapshot()
            .object_iris(&Pattern::any().subject(iri(subject)).predicate(predicate))
    }

    #[tokio::test]
    async fn first_version_becomes_current() {
        let store = MemoryStore::new();
        advance(&store, "urn:test:a/1", "urn:test:inf1", false, VersionLinkPolicy::Replace).await;

        assert_eq!(
            objects(&store, "urn:test:a", vocabulary::current_version()),
            vec![iri("urn:test:a/1")]
        );
        assert_eq!(
            objects(&store, "urn:test:a/1", vocabulary::inferred_version()),
            vec![iri("urn:test:inf1")]
        );
    }

    #[tokio::test]
    async fn current_pointer_moves_only_when_requested() {
        let store = MemoryStore::new();
        let policy = VersionLinkPolicy::Accumulate;
        advance(&store, "urn:test:a/1", "urn:test:inf1", false, policy).await;
        advance(&store, "urn:test:a/2", "urn:test:inf2", false, policy).await;
        assert_eq!(
            objects(&store, "urn:test:a", vocabulary::current_version()),
            vec![iri("urn:test:a/1")]
        );

        advance(&store, "urn:test:a/3", "urn:test:inf3", true, VersionLinkPolicy::Accumulate).await;
        assert_eq!(
            objects(&store, "urn:test:a", vocabulary::current_version()),
            vec![iri("urn:test:a/3")]
        );
        assert_eq!(
            objects(&store, "urn:test:a", vocabulary::owl_version_iri()).len(),
            3
        );
    }

    #[tokio::test]
    async fn replace_collects_superseded_inferred_graph() {
        let store = MemoryStore::new();
        advance(&store, "urn:test:a/1", "urn:test:inf1", false, VersionLinkPolicy::Replace).await;
        advance(&store, "urn:test:a/2", "urn:test:inf2", true, VersionLinkPolicy::Replace).await;

        let snapshot = store.snapshot();
        assert!(!snapshot.contains(&Pattern::any().subject(iri("urn:test:inf1"))));
        assert!(!snapshot.contains(&Pattern::any().subject(iri("urn:test:a/1"))));
        assert_eq!(
            objects(&store, "urn:test:a", vocabulary::owl_version_iri()),
            vec![iri("urn:test:a/2")]
        );
        assert_eq!(
            objects(&store, "urn:test:a", vocabulary::current_inferred_version()),
            vec![iri("urn:test:inf2")]
        );
    }

    #[tokio::test]
    async fn rejects_unversioned_identity() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.expect("begin");
        let err = advance_version(
            tx.as_mut(),
            &VersionedOntologyId::unversioned(iri("urn:test:a")),
            &inferred("urn:test:inf"),
            true,
            &iri("urn:test:ctx"),
            VersionLinkPolicy::Replace,
        )
        .await
        .expect_err("no version");
        assert!(matches!(err, Error::MalformedIdentity(_)));
    }
}
