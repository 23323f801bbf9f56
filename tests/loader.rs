mod common;

use std::sync::Arc;

use common::{iri, manifest, versioned};
use ontology_vault::{
    graph::{QuadStore, Statement},
    management::ManagementStore,
    ontology::vocabulary,
    schema::{HierarchyReasoner, SchemaLoader},
    Error, VersionedOntologyId,
};

const PREFIX: &str = "urn:test:inferred:";

fn loader(management: &ManagementStore) -> SchemaLoader {
    SchemaLoader::new(
        management.clone(),
        Arc::new(HierarchyReasoner::default()),
        PREFIX,
    )
}

#[tokio::test]
async fn unmet_import_aborts_the_whole_batch() {
    let (store, management) = common::management();
    let graph = manifest(&[
        ("urn:test:a", "urn:test:a/1", &[]),
        ("urn:test:c", "urn:test:c/1", &["urn:test:b/1"]),
        ("urn:test:b", "urn:test:b/1", &[]),
    ]);

    let err = loader(&management)
        .load_in_order(
            &graph,
            &[
                versioned("urn:test:a", "urn:test:a/1"),
                versioned("urn:test:c", "urn:test:c/1"),
                versioned("urn:test:b", "urn:test:b/1"),
            ],
        )
        .await
        .expect_err("missing import");

    assert!(matches!(
        &err,
        Error::MissingImport { import, version }
            if import.as_str() == "urn:test:b/1" && version.as_str() == "urn:test:c/1"
    ));
    assert_eq!(store.size().await.expect("size"), 0);
}

#[tokio::test]
async fn loads_versions_in_dependency_order() {
    let (_, management) = common::management();
    let mut graph = manifest(&[
        ("urn:test:a", "urn:test:a/1", &[]),
        ("urn:test:b", "urn:test:b/1", &["urn:test:a/1"]),
        ("urn:test:b", "urn:test:b/2", &["urn:test:a/1"]),
        ("urn:test:c", "urn:test:c/1", &["urn:test:b/1"]),
        ("urn:test:c", "urn:test:c/3", &["urn:test:b"]),
    ]);
    graph.insert(Statement::triple(
        &iri("urn:test:c"),
        vocabulary::current_version(),
        &iri("urn:test:c/3"),
    ));
    let order = [
        versioned("urn:test:a", "urn:test:a/1"),
        versioned("urn:test:b", "urn:test:b/1"),
        versioned("urn:test:b", "urn:test:b/2"),
        versioned("urn:test:c", "urn:test:c/1"),
        versioned("urn:test:c", "urn:test:c/3"),
    ];
    let loader = loader(&management);

    let report = loader.load_in_order(&graph, &order).await.expect("load");
    assert_eq!(report.current_schemas, 3);
    assert_eq!(report.schema_versions, 5);
    assert_eq!(report.loaded.len(), 5);
    assert!(report.skipped.is_empty());
    assert_eq!(
        report.loaded[0].inferred_iri(),
        Some(&iri("urn:test:inferred:urn:test:a/1"))
    );

    let b = management
        .current_schema_version(&iri("urn:test:b"))
        .await
        .expect("b");
    assert_eq!(b.version_iri(), Some(&iri("urn:test:b/1")));
    let c = management
        .current_schema_version(&iri("urn:test:c"))
        .await
        .expect("c");
    assert_eq!(c.version_iri(), Some(&iri("urn:test:c/3")));

    let again = loader.load_in_order(&graph, &order).await.expect("reload");
    assert_eq!(again.current_schemas, 3);
    assert_eq!(again.schema_versions, 5);
    assert!(again.loaded.is_empty());
    assert_eq!(again.skipped.len(), 5);
}

#[tokio::test]
async fn explicit_inferred_iris_are_kept() {
    let (_, management) = common::management();
    let graph = manifest(&[("urn:test:a", "urn:test:a/1", &[])]);
    let entry = versioned("urn:test:a", "urn:test:a/1")
        .with_inferred(iri("urn:test:a/1-inferred"))
        .expect("inferred");

    let report = loader(&management)
        .load_in_order(&graph, &[entry])
        .await
        .expect("load");
    assert_eq!(
        report.loaded[0].inferred_iri(),
        Some(&iri("urn:test:a/1-inferred"))
    );
    let current = management
        .current_schema_version(&iri("urn:test:a"))
        .await
        .expect("current");
    assert_eq!(current.inferred_iri(), Some(&iri("urn:test:a/1-inferred")));
}

#[tokio::test]
async fn unversioned_entries_are_rejected() {
    let (store, management) = common::management();
    let graph = manifest(&[("urn:test:a", "urn:test:a/1", &[])]);

    let err = loader(&management)
        .load_in_order(
            &graph,
            &[
                versioned("urn:test:a", "urn:test:a/1"),
                VersionedOntologyId::unversioned(iri("urn:test:b")),
            ],
        )
        .await
        .expect_err("unversioned");
    assert!(matches!(err, Error::MalformedIdentity(_)));
    assert_eq!(store.size().await.expect("size"), 0);
}

#[tokio::test]
async fn content_is_never_loaded_into_a_management_context() {
    let (store, management) = common::management();
    let reserved = vocabulary::DEFAULT_REPOSITORY_MANAGEMENT_GRAPH;
    let graph = manifest(&[
        ("urn:test:a", "urn:test:a/1", &[]),
        ("urn:test:b", reserved, &[]),
    ]);

    let err = loader(&management)
        .load_in_order(
            &graph,
            &[
                versioned("urn:test:a", "urn:test:a/1"),
                versioned("urn:test:b", reserved),
            ],
        )
        .await
        .expect_err("management context");

    assert!(matches!(err, Error::MalformedIdentity(_)));
    assert_eq!(store.size().await.expect("size"), 0);
}
