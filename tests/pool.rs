mod common;

use std::{fs, sync::Arc};

use common::{iri, versioned, FailPoint, FailingStore};
use ontology_vault::{
    graph::{MemoryStore, Pattern, QuadStore, Statement, StoreTransaction},
    management::{ManagementGraphs, ManagementStore},
    pool::{manager::RepositoryManagerConfig, records, PoolSettings, RepositoryPool},
    schema::{HierarchyReasoner, SchemaLoader},
    Error, SchemaVersionSet, VersionedOntologyId,
};

fn settings(label: &str) -> PoolSettings {
    PoolSettings {
        home_directory: common::temp_dir(label),
        remote_server_url: None,
    }
}

fn pool(label: &str) -> (MemoryStore, RepositoryPool) {
    let (store, management) = common::management();
    (store, RepositoryPool::new(management, settings(label)))
}

fn schemas(entries: &[(&str, &str)]) -> SchemaVersionSet {
    entries
        .iter()
        .map(|(ontology, version)| versioned(ontology, version))
        .collect()
}

async fn record(management: &ManagementStore, statements: Vec<Statement>) {
    let mut tx = management.begin().await.expect("begin");
    tx.add_all(statements).await.expect("add");
    tx.commit().await.expect("commit");
}

async fn recorded_repositories(store: &MemoryStore) -> usize {
    let context = ManagementGraphs::default().repository;
    let graph = store
        .export(&Pattern::in_context(&context))
        .await
        .expect("export");
    records::repositories(&graph).len()
}

#[tokio::test]
async fn equivalent_sets_share_one_backend() {
    let (store, pool) = pool("pool-shared");

    let first = pool
        .acquire(&schemas(&[("urn:test:a", "urn:test:a/1"), ("urn:test:b", "urn:test:b/1")]))
        .await
        .expect("first");
    let second = pool
        .acquire(&schemas(&[("urn:test:b", "urn:test:b/1"), ("urn:test:a", "urn:test:a/1")]))
        .await
        .expect("second");

    assert!(first.same_backend(&second));
    assert_eq!(pool.cached().len(), 1);
    assert_eq!(recorded_repositories(&store).await, 1);
    pool.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn matching_is_exact() {
    let (store, pool) = pool("pool-exact");

    let single = pool
        .acquire(&schemas(&[("urn:test:a", "urn:test:a/1")]))
        .await
        .expect("single");
    let superset = pool
        .acquire(&schemas(&[("urn:test:a", "urn:test:a/1"), ("urn:test:b", "urn:test:b/1")]))
        .await
        .expect("superset");
    let other_version = pool
        .acquire(&schemas(&[("urn:test:a", "urn:test:a/2")]))
        .await
        .expect("other version");

    assert!(!single.same_backend(&superset));
    assert!(!single.same_backend(&other_version));
    assert_ne!(single.repository_iri(), superset.repository_iri());
    assert_eq!(recorded_repositories(&store).await, 3);
    pool.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn rejects_empty_and_unversioned_sets() {
    let (store, pool) = pool("pool-invalid");

    let err = pool
        .acquire(&SchemaVersionSet::default())
        .await
        .expect_err("empty");
    assert!(matches!(err, Error::EmptySchemaSet));

    let err = pool
        .acquire(&SchemaVersionSet::new([VersionedOntologyId::unversioned(iri(
            "urn:test:a",
        ))]))
        .await
        .expect_err("unversioned");
    assert!(matches!(err, Error::MalformedIdentity(_)));

    assert_eq!(store.size().await.expect("size"), 0);
    pool.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn records_survive_a_new_pool() {
    let management_dir = common::temp_dir("pool-management");
    let pool_settings = settings("pool-durable");
    let requested = schemas(&[("urn:test:a", "urn:test:a/1")]);

    let created = {
        let store = MemoryStore::open_persistent(&management_dir).expect("management");
        let management = ManagementStore::new(Arc::new(store), ManagementGraphs::default());
        let pool = RepositoryPool::new(management, pool_settings.clone());
        let handle = pool.acquire(&requested).await.expect("create");
        let iri = handle.repository_iri().clone();
        pool.shutdown().await.expect("shutdown");
        iri
    };

    let store = MemoryStore::open_persistent(&management_dir).expect("management");
    let management = ManagementStore::new(Arc::new(store.clone()), ManagementGraphs::default());
    let pool = RepositoryPool::new(management, pool_settings.clone());
    let reopened = pool.acquire(&requested).await.expect("reopen");

    assert_eq!(reopened.repository_iri(), &created);
    assert_eq!(recorded_repositories(&store).await, 1);
    pool.shutdown().await.expect("shutdown");
    let _ = fs::remove_dir_all(&management_dir);
    let _ = fs::remove_dir_all(&pool_settings.home_directory);
}

#[tokio::test]
async fn shutdown_is_terminal() {
    let (_, pool) = pool("pool-shutdown");
    let handle = pool
        .acquire(&schemas(&[("urn:test:a", "urn:test:a/1")]))
        .await
        .expect("acquire");

    pool.shutdown().await.expect("shutdown");
    pool.shutdown().await.expect("second shutdown");

    let err = pool
        .acquire(&schemas(&[("urn:test:a", "urn:test:a/1")]))
        .await
        .expect_err("shut down");
    assert!(matches!(err, Error::PoolShutDown));
    assert!(!handle.store().is_open());
    assert!(pool.cached().is_empty());
}

#[tokio::test]
async fn remote_backend_without_connector_records_nothing() {
    let (store, management) = common::management();
    let pool = RepositoryPool::new(
        management,
        PoolSettings {
            home_directory: common::temp_dir("pool-remote"),
            remote_server_url: Some("http://localhost:8080/rdf4j-server".to_string()),
        },
    );

    let err = pool
        .acquire(&schemas(&[("urn:test:a", "urn:test:a/1")]))
        .await
        .expect_err("remote");
    assert!(matches!(err, Error::RemoteUnavailable { .. }));
    assert_eq!(store.size().await.expect("size"), 0);
    pool.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn failed_record_commit_removes_the_new_backend() {
    let memory = MemoryStore::named("management");
    let failing = FailingStore::new(memory.clone(), FailPoint::Commit);
    let management = ManagementStore::new(Arc::new(failing.clone()), ManagementGraphs::default());
    let pool_settings = settings("pool-commit");
    let pool = RepositoryPool::new(management, pool_settings.clone());

    failing.arm();
    let err = pool
        .acquire(&schemas(&[("urn:test:a", "urn:test:a/1")]))
        .await
        .expect_err("commit fails");
    assert!(matches!(err, Error::StoreTransaction(_)));
    assert_eq!(memory.size().await.expect("size"), 0);
    assert!(pool.cached().is_empty());
    let leftovers = fs::read_dir(&pool_settings.home_directory)
        .expect("home directory")
        .count();
    assert_eq!(leftovers, 0);

    failing.disarm();
    pool.acquire(&schemas(&[("urn:test:a", "urn:test:a/1")]))
        .await
        .expect("retry");
    pool.shutdown().await.expect("shutdown");
    let _ = fs::remove_dir_all(&pool_settings.home_directory);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_acquires_create_one_backend() {
    let (store, pool) = pool("pool-concurrent");
    let pool = Arc::new(pool);
    let requested = schemas(&[("urn:test:a", "urn:test:a/1"), ("urn:test:b", "urn:test:b/1")]);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let requested = requested.clone();
            tokio::spawn(async move { pool.acquire(&requested).await })
        })
        .collect();

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.expect("join").expect("acquire"));
    }
    assert!(handles.windows(2).all(|pair| pair[0].same_backend(&pair[1])));
    assert_eq!(recorded_repositories(&store).await, 1);
    pool.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn new_repositories_receive_loaded_schema_content() {
    let (_, management) = common::management();
    let loader = SchemaLoader::new(
        management.clone(),
        Arc::new(HierarchyReasoner::default()),
        ontology_vault::ontology::vocabulary::DEFAULT_INFERRED_PREFIX,
    );
    let mut manifest = common::manifest(&[("urn:test:a", "urn:test:a/1", &[])]);
    let version = iri("urn:test:a/1");
    for (child, parent) in [("urn:test:X", "urn:test:Y"), ("urn:test:Y", "urn:test:Z")] {
        manifest.insert(ontology_vault::graph::Statement::new(
            &iri(child),
            iri("http://www.w3.org/2000/01/rdf-schema#subClassOf"),
            &iri(parent),
            Some(version.clone()),
        ));
    }
    let report = loader
        .load_in_order(&manifest, &[versioned("urn:test:a", "urn:test:a/1")])
        .await
        .expect("load");
    let loaded = report.loaded[0].clone();
    let inferred = loaded.inferred_iri().expect("inferred iri").clone();

    let pool = RepositoryPool::new(management.clone(), settings("pool-copy"));
    let current: SchemaVersionSet = management
        .current_schema_ontologies()
        .await
        .expect("current")
        .into();
    let handle = pool.acquire(&current).await.expect("acquire");
    let repository = handle.store();

    let content = repository
        .statements(&Pattern::in_context(&version))
        .await
        .expect("content");
    assert_eq!(content.len(), manifest.len());
    let inferred_statements = repository
        .statements(&Pattern::in_context(&inferred))
        .await
        .expect("inferred");
    assert_eq!(inferred_statements.len(), 1);
    pool.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn temporary_stores_are_not_pooled() {
    let (store, pool) = pool("pool-temporary");
    let first = pool.new_temporary_store();
    let second = pool.new_temporary_store();

    assert_ne!(first.name(), second.name());
    assert_eq!(first.size().await.expect("size"), 0);
    assert!(pool.cached().is_empty());
    assert_eq!(store.size().await.expect("size"), 0);
    pool.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn two_records_for_one_set_are_refused() {
    let (store, management) = common::management();
    let pool_settings = settings("pool-duplicate-records");
    let requested = schemas(&[("urn:test:a", "urn:test:a/1")]);
    let first = RepositoryPool::new(management.clone(), pool_settings.clone());
    let handle = first.acquire(&requested).await.expect("create");

    record(
        &management,
        records::repository_statements(
            &iri("urn:test:repository:second"),
            handle.manager_iri(),
            "second",
            &requested,
            chrono::Utc::now(),
            &management.graphs().repository,
        ),
    )
    .await;
    assert_eq!(recorded_repositories(&store).await, 2);

    let second = RepositoryPool::new(management.clone(), pool_settings.clone());
    let err = second.acquire(&requested).await.expect_err("ambiguous");
    assert!(matches!(err, Error::DuplicateRepositoryManager { count: 2, .. }));
    assert!(second.cached().is_empty());

    first.shutdown().await.expect("shutdown");
    let _ = fs::remove_dir_all(&pool_settings.home_directory);
}

#[tokio::test]
async fn two_managers_for_one_backend_are_refused() {
    let (store, management) = common::management();
    let pool_settings = settings("pool-duplicate-managers");
    let config = RepositoryManagerConfig::Local(pool_settings.home_directory.clone());
    for manager in ["urn:test:manager:1", "urn:test:manager:2"] {
        record(
            &management,
            records::manager_statements(&iri(manager), &config, &management.graphs().repository),
        )
        .await;
    }
    let before = store.size().await.expect("size");

    let pool = RepositoryPool::new(management, pool_settings.clone());
    let err = pool
        .acquire(&schemas(&[("urn:test:a", "urn:test:a/1")]))
        .await
        .expect_err("ambiguous");

    assert!(matches!(
        &err,
        Error::DuplicateRepositoryManager { lookup, count: 2 } if *lookup == config.to_string()
    ));
    assert_eq!(store.size().await.expect("size"), before);
    assert_eq!(recorded_repositories(&store).await, 0);
    pool.shutdown().await.expect("shutdown");
    let _ = fs::remove_dir_all(&pool_settings.home_directory);
}
