//! Conversion between statements and [`VersionedOntologyId`] lists.
//!
//! Encoding an identity emits:
//!
//! ```text
//! <ontology> rdf:type owl:Ontology .
//! <ontology> owl:versionIRI <version> .
//! <version>  rdf:type owl:Ontology .
//! <inferred> rdf:type owl:Ontology .
//! <version>  vault:inferredVersion <inferred> .
//! ```
//!
//! Decoding reads the same shape back. When a version carries no explicit
//! inferred link, anything that `owl:imports` the version is taken as its
//! inferred ontology, which covers data written before inferred versions were
//! tracked explicitly.

use std::collections::BTreeSet;

use super::{identity::VersionedOntologyId, value_objects::Iri, vocabulary};
use crate::graph::{Graph, Pattern, Resource, Statement};

/// Extracts every versioned identity described by `graph`, in every context.
///
/// Ontologies without a version are not reported. A version with several
/// inferred links yields one identity per link.
#[must_use]
pub fn decode(graph: &Graph) -> Vec<VersionedOntologyId> {
    let mut seen = BTreeSet::new();
    let mut results = Vec::new();

    let typed = Pattern::any()
        .predicate(vocabulary::rdf_type())
        .object(vocabulary::owl_ontology());
    for ontology in graph.subject_iris(&typed) {
        let versions = graph.object_iris(
            &Pattern::any()
                .subject(&ontology)
                .predicate(vocabulary::owl_version_iri()),
        );
        for version in versions {
            for inferred in inferred_for(graph, &version) {
                let id = VersionedOntologyId::try_new(
                    Some(ontology.clone()),
                    Some(version.clone()),
                    inferred,
                );
                // the constructor only rejects identities without a version
                if let Ok(id) = id {
                    if seen.insert(id.clone()) {
                        results.push(id);
                    }
                }
            }
        }
    }

    results
}

fn inferred_for(graph: &Graph, version: &Iri) -> Vec<Option<Iri>> {
    let explicit = graph.object_iris(
        &Pattern::any()
            .subject(version)
            .predicate(vocabulary::inferred_version()),
    );
    if !explicit.is_empty() {
        return explicit.into_iter().map(Some).collect();
    }

    let importers: Vec<Option<Iri>> = graph
        .filter(
            &Pattern::any()
                .predicate(vocabulary::owl_imports())
                .object(version),
        )
        .filter_map(|statement| match &statement.subject {
            Resource::Iri(importer) => Some(Some(importer.clone())),
            Resource::Blank(_) => {
                tracing::warn!(statement = %statement, "codec_blank_importer_skipped");
                None
            }
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if importers.is_empty() {
        vec![None]
    } else {
        importers
    }
}

/// Renders identities as statements in the default graph.
///
/// Anonymous identities contribute nothing.
#[must_use]
pub fn encode(ids: &[VersionedOntologyId]) -> Graph {
    encode_in_context(ids, None)
}

/// Renders identities as statements inside `context`.
#[must_use]
pub fn encode_in_context(ids: &[VersionedOntologyId], context: Option<&Iri>) -> Graph {
    let mut graph = Graph::new();
    for id in ids {
        let Some(ontology) = id.ontology_iri() else {
            continue;
        };
        let statement = |subject: &Iri, predicate: Iri, object: &Iri| {
            Statement::new(subject, predicate, object, context.cloned())
        };

        graph.insert(statement(
            ontology,
            vocabulary::rdf_type(),
            &vocabulary::owl_ontology(),
        ));
        let Some(version) = id.version_iri() else {
            continue;
        };
        graph.insert(statement(ontology, vocabulary::owl_version_iri(), version));
        graph.insert(statement(
            version,
            vocabulary::rdf_type(),
            &vocabulary::owl_ontology(),
        ));
        if let Some(inferred) = id.inferred_iri() {
            graph.insert(statement(
                inferred,
                vocabulary::rdf_type(),
                &vocabulary::owl_ontology(),
            ));
            graph.insert(statement(version, vocabulary::inferred_version(), inferred));
        }
    }
    graph
}
