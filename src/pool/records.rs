//! Durable repository-manager and repository records.
//!
//! ```text
//! <manager>    rdf:type               vault:RepositoryManager .
//! <manager>    vault:repositoryManagerType  vault:LocalRepositoryManager .
//! <manager>    vault:localRepositoryManagerDirectory  "/var/lib/vault" .
//! <manager>    vault:repositoryManagerContainsRepository  <repository> .
//! <repository> rdf:type               vault:Repository .
//! <repository> vault:repositoryIdInManager  "urn-vault-repository-..." .
//! <repository> vault:repositoryContainsSchemaIRI      <ontology> .
//! <repository> vault:repositoryContainsSchemaVersion  <version> .
//! <repository> dcterms:created        "2024-01-01T00:00:00Z" .
//! ```

use std::{collections::BTreeSet, path::PathBuf};

use chrono::{DateTime, Utc};

use super::manager::RepositoryManagerConfig;
use crate::{
    graph::{Graph, Pattern, Statement, Value},
    ontology::{value_objects::Iri, vocabulary, SchemaVersionSet},
    Error, Result,
};

/// One repository as recorded in the repository management context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryRecord {
    pub repository: Iri,
    pub manager: Iri,
    pub id_in_manager: Option<String>,
    pub schema_iris: BTreeSet<Iri>,
    pub schema_versions: BTreeSet<Iri>,
}

impl RepositoryRecord {
    /// Same cardinality, every requested version present, nothing extra.
    #[must_use]
    pub fn serves_exactly(&self, schemas: &SchemaVersionSet) -> bool {
        let requested: BTreeSet<&Iri> = schemas.version_iris().into_iter().collect();
        requested.len() == schemas.len()
            && self.schema_versions.len() == requested.len()
            && self.schema_versions.iter().all(|v| requested.contains(v))
    }
}

/// Reads every repository owned by a recorded manager.
#[must_use]
pub fn repositories(graph: &Graph) -> Vec<RepositoryRecord> {
    let mut records = Vec::new();
    for manager in managers(graph) {
        let owned = graph.object_iris(
            &Pattern::any()
                .subject(&manager)
                .predicate(vocabulary::term(vocabulary::MANAGER_CONTAINS_REPOSITORY)),
        );
        for repository in owned {
            let about = |predicate: &str| {
                Pattern::any()
                    .subject(&repository)
                    .predicate(vocabulary::term(predicate))
            };
            let id_in_manager = graph
                .filter(&about(vocabulary::REPOSITORY_ID_IN_MANAGER))
                .find_map(|s| s.object.as_literal().map(str::to_string));
            records.push(RepositoryRecord {
                schema_iris: graph
                    .object_iris(&about(vocabulary::REPOSITORY_CONTAINS_SCHEMA_IRI))
                    .into_iter()
                    .collect(),
                schema_versions: graph
                    .object_iris(&about(vocabulary::REPOSITORY_CONTAINS_SCHEMA_VERSION))
                    .into_iter()
                    .collect(),
                id_in_manager,
                manager: manager.clone(),
                repository,
            });
        }
    }
    records
}

/// Records whose schema versions exactly match `schemas`.
#[must_use]
pub fn exact_matches(graph: &Graph, schemas: &SchemaVersionSet) -> Vec<RepositoryRecord> {
    repositories(graph)
        .into_iter()
        .filter(|record| record.serves_exactly(schemas))
        .collect()
}

fn managers(graph: &Graph) -> Vec<Iri> {
    graph.subject_iris(
        &Pattern::any()
            .predicate(vocabulary::rdf_type())
            .object(vocabulary::term(vocabulary::REPOSITORY_MANAGER)),
    )
}

fn literal(graph: &Graph, subject: &Iri, predicate: &str) -> Option<String> {
    graph
        .filter(
            &Pattern::any()
                .subject(subject)
                .predicate(vocabulary::term(predicate)),
        )
        .find_map(|s| s.object.as_literal().map(str::to_string))
}

/// Resolves the recorded backend of `manager` into a configuration.
///
/// A local manager without a recorded directory falls back to a fresh
/// temporary directory.
///
/// # Errors
///
/// [`Error::UnrecognizedRepositoryManagerType`] for unknown or missing type
/// tags, [`Error::RemoteUnavailable`] for a remote manager without a URL.
pub fn manager_config(graph: &Graph, manager: &Iri) -> Result<RepositoryManagerConfig> {
    let kind = graph
        .object_iris(
            &Pattern::any()
                .subject(manager)
                .predicate(vocabulary::term(vocabulary::MANAGER_TYPE)),
        )
        .into_iter()
        .next();

    match kind.as_ref().map(Iri::as_str) {
        Some(vocabulary::MANAGER_TYPE_LOCAL) => {
            match literal(graph, manager, vocabulary::MANAGER_LOCAL_DIRECTORY) {
                Some(directory) => Ok(RepositoryManagerConfig::Local(PathBuf::from(directory))),
                None => {
                    let directory = std::env::temp_dir().join(format!(
                        "ontology-vault-temp-repositories-{}",
                        uuid::Uuid::new_v4()
                    ));
                    tracing::warn!(
                        manager = %manager,
                        directory = %directory.display(),
                        "temporary_local_repositories_in_use"
                    );
                    Ok(RepositoryManagerConfig::Local(directory))
                }
            }
        }
        Some(vocabulary::MANAGER_TYPE_REMOTE) => {
            literal(graph, manager, vocabulary::MANAGER_REMOTE_SERVER_URL)
                .map(RepositoryManagerConfig::Remote)
                .ok_or_else(|| Error::RemoteUnavailable {
                    url: String::new(),
                    reason: format!("manager `{manager}` records no server URL"),
                })
        }
        other => Err(Error::UnrecognizedRepositoryManagerType {
            manager: manager.clone(),
            kind: other.unwrap_or("<none>").to_string(),
        }),
    }
}

/// Managers recorded with exactly `config` as their backend.
#[must_use]
pub fn managers_with(graph: &Graph, config: &RepositoryManagerConfig) -> Vec<Iri> {
    let (kind, predicate, value) = describe(config);
    managers(graph)
        .into_iter()
        .filter(|manager| {
            graph.contains(
                &Pattern::any()
                    .subject(manager)
                    .predicate(vocabulary::term(vocabulary::MANAGER_TYPE))
                    .object(vocabulary::term(kind)),
            ) && literal(graph, manager, predicate).as_deref() == Some(value.as_str())
        })
        .collect()
}

fn describe(config: &RepositoryManagerConfig) -> (&'static str, &'static str, String) {
    match config {
        RepositoryManagerConfig::Local(directory) => (
            vocabulary::MANAGER_TYPE_LOCAL,
            vocabulary::MANAGER_LOCAL_DIRECTORY,
            directory.display().to_string(),
        ),
        RepositoryManagerConfig::Remote(url) => (
            vocabulary::MANAGER_TYPE_REMOTE,
            vocabulary::MANAGER_REMOTE_SERVER_URL,
            url.clone(),
        ),
    }
}

/// Statements describing a new repository manager.
#[must_use]
pub fn manager_statements(
    manager: &Iri,
    config: &RepositoryManagerConfig,
    context: &Iri,
) -> Vec<Statement> {
    let (kind, predicate, value) = describe(config);
    let ctx = Some(context.clone());
    vec![
        Statement::new(
            manager,
            vocabulary::rdf_type(),
            vocabulary::term(vocabulary::REPOSITORY_MANAGER),
            ctx.clone(),
        ),
        Statement::new(
            manager,
            vocabulary::term(vocabulary::MANAGER_TYPE),
            vocabulary::term(kind),
            ctx.clone(),
        ),
        Statement::new(manager, vocabulary::term(predicate), Value::literal(value), ctx),
    ]
}

/// Statements recording a repository, its owner and the schemas it serves.
#[must_use]
pub fn repository_statements(
    repository: &Iri,
    manager: &Iri,
    id_in_manager: &str,
    schemas: &SchemaVersionSet,
    created: DateTime<Utc>,
    context: &Iri,
) -> Vec<Statement> {
    let ctx = Some(context.clone());
    let mut statements = vec![
        Statement::new(
            manager,
            vocabulary::term(vocabulary::MANAGER_CONTAINS_REPOSITORY),
            repository,
            ctx.clone(),
        ),
        Statement::new(
            repository,
            vocabulary::rdf_type(),
            vocabulary::term(vocabulary::REPOSITORY),
            ctx.clone(),
        ),
        Statement::new(
            repository,
            vocabulary::term(vocabulary::REPOSITORY_ID_IN_MANAGER),
            Value::literal(id_in_manager),
            ctx.clone(),
        ),
        Statement::new(
            repository,
            vocabulary::term(vocabulary::DCTERMS_CREATED),
            Value::literal(created.to_rfc3339()),
            ctx.clone(),
        ),
    ];
    for schema in schemas {
        if let Some(ontology) = schema.ontology_iri() {
            statements.push(Statement::new(
                repository,
                vocabulary::term(vocabulary::REPOSITORY_CONTAINS_SCHEMA_IRI),
                ontology,
                ctx.clone(),
            ));
        }
        if let Some(version) = schema.version_iri() {
            statements.push(Statement::new(
                repository,
                vocabulary::term(vocabulary::REPOSITORY_CONTAINS_SCHEMA_VERSION),
                version,
                ctx.clone(),
            ));
        }
    }
    statements
}

/// Patterns that erase a repository record.
#[must_use]
pub fn repository_removal(repository: &Iri, manager: &Iri, context: &Iri) -> Vec<Pattern> {
    vec![
        Pattern::in_context(context).subject(repository),
        Pattern::in_context(context)
            .subject(manager)
            .predicate(vocabulary::term(vocabulary::MANAGER_CONTAINS_REPOSITORY))
            .object(repository),
    ]
}
