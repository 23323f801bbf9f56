use std::collections::{BTreeMap, BTreeSet, VecDeque};

use async_trait::async_trait;

use crate::{
    config::ReasonerSettings,
    graph::{Graph, Statement, Value},
    ontology::{value_objects::Iri, vocabulary},
    Result,
};

/// Computes the inferred statements of a schema version.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Returns the statements entailed by `base` together with the already
    /// loaded `schemas` it depends on, minus those already asserted.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Reasoner`] when inference cannot complete.
    async fn infer(&self, base: &Graph, schemas: &[Graph]) -> Result<Graph>;
}

/// Native reasoner over the RDFS class and property hierarchies.
#[derive(Clone, Debug, Default)]
pub struct HierarchyReasoner {
    settings: ReasonerSettings,
}

impl HierarchyReasoner {
    #[must_use]
    pub fn new(settings: ReasonerSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &ReasonerSettings {
        &self.settings
    }
}

#[async_trait]
impl Reasoner for HierarchyReasoner {
    async fn infer(&self, base: &Graph, schemas: &[Graph]) -> Result<Graph> {
        let mut asserted = base.with_context(None);
        for schema in schemas {
            asserted.extend(schema.with_context(None));
        }

        let classes = parents(&asserted, &vocabulary::term(vocabulary::RDFS_SUB_CLASS_OF));
        let properties = parents(&asserted, &vocabulary::term(vocabulary::RDFS_SUB_PROPERTY_OF));
        let inference = &self.settings.inference;
        let mut inferred = Graph::new();

        if inference.class_hierarchy {
            inferred.extend(closure(
                &classes,
                &vocabulary::term(vocabulary::RDFS_SUB_CLASS_OF),
            ));
        }
        if inference.property_hierarchy {
            inferred.extend(closure(
                &properties,
                &vocabulary::term(vocabulary::RDFS_SUB_PROPERTY_OF),
            ));
            for statement in base.iter() {
                for ancestor in ancestors(&properties, &statement.predicate) {
                    inferred.insert(Statement {
                        predicate: ancestor,
                        context: None,
                        ..statement.clone()
                    });
                }
            }
        }
        if inference.type_propagation {
            let rdf_type = vocabulary::rdf_type();
            for statement in base.iter().filter(|s| s.predicate == rdf_type) {
                let Some(class) = statement.object.as_iri() else {
                    continue;
                };
                for ancestor in ancestors(&classes, class) {
                    inferred.insert(Statement::triple(
                        statement.subject.clone(),
                        rdf_type.clone(),
                        ancestor,
                    ));
                }
            }
        }

        let novel: Graph = inferred
            .into_iter()
            .filter(|statement| !asserted_contains(&asserted, statement))
            .collect();
        tracing::debug!(statements = novel.len(), "reasoner_inferred");
        Ok(novel)
    }
}

fn asserted_contains(asserted: &Graph, statement: &Statement) -> bool {
    asserted.iter().any(|existing| existing == statement)
}

/// Direct parents keyed by child, read from `predicate` statements.
fn parents(graph: &Graph, predicate: &Iri) -> BTreeMap<Iri, BTreeSet<Iri>> {
    let mut parents: BTreeMap<Iri, BTreeSet<Iri>> = BTreeMap::new();
    for statement in graph.iter().filter(|s| &s.predicate == predicate) {
        let (Some(child), Some(parent)) = (statement.subject.as_iri(), statement.object.as_iri())
        else {
            continue;
        };
        parents
            .entry(child.clone())
            .or_default()
            .insert(parent.clone());
    }
    parents
}

/// Breadth-first walk up the hierarchy, excluding the start itself.
fn ancestors(parents: &BTreeMap<Iri, BTreeSet<Iri>>, start: &Iri) -> Vec<Iri> {
    let Some(direct) = parents.get(start) else {
        return Vec::new();
    };

    let mut visited = BTreeSet::new();
    let mut to_visit: VecDeque<Iri> = direct.iter().cloned().collect();
    let mut result = Vec::new();

    while let Some(current) = to_visit.pop_front() {
        if visited.insert(current.clone()) {
            if &current != start {
                result.push(current.clone());
            }
            if let Some(next) = parents.get(&current) {
                to_visit.extend(next.iter().cloned());
            }
        }
    }

    result
}

fn closure(parents: &BTreeMap<Iri, BTreeSet<Iri>>, predicate: &Iri) -> Vec<Statement> {
    parents
        .keys()
        .flat_map(|child| {
            ancestors(parents, child)
                .into_iter()
                .map(move |ancestor| {
                    Statement::triple(child, predicate.clone(), Value::from(ancestor))
                })
        })
        .collect()
}
