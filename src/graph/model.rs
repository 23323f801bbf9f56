//! Statement model shared by every store implementation.
//!
//! Statements are quads: a triple plus an optional named context. A
//! statement without a context lives in the default graph.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use oxrdf::{BlankNode, Literal};
use serde::{Deserialize, Serialize};

use crate::ontology::value_objects::Iri;

/// Subject position of a statement.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Resource {
    Iri(Iri),
    Blank(String),
}

impl Resource {
    #[must_use]
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Self::Iri(iri) => Some(iri),
            Self::Blank(_) => None,
        }
    }
}

impl From<Iri> for Resource {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

impl From<&Iri> for Resource {
    fn from(iri: &Iri) -> Self {
        Self::Iri(iri.clone())
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "{}", iri.to_named_node()),
            Self::Blank(id) => write!(f, "{}", BlankNode::new_unchecked(id.as_str())),
        }
    }
}

/// Object position of a statement.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Iri(Iri),
    Blank(String),
    Literal(String),
}

impl Value {
    /// Creates a plain literal value.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    #[must_use]
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Converts the value into a subject when it is not a literal.
    #[must_use]
    pub fn to_resource(&self) -> Option<Resource> {
        match self {
            Self::Iri(iri) => Some(Resource::Iri(iri.clone())),
            Self::Blank(id) => Some(Resource::Blank(id.clone())),
            Self::Literal(_) => None,
        }
    }
}

impl From<Iri> for Value {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

impl From<&Iri> for Value {
    fn from(iri: &Iri) -> Self {
        Self::Iri(iri.clone())
    }
}

impl From<Resource> for Value {
    fn from(resource: Resource) -> Self {
        match resource {
            Resource::Iri(iri) => Self::Iri(iri),
            Resource::Blank(id) => Self::Blank(id),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "{}", iri.to_named_node()),
            Self::Blank(id) => write!(f, "{}", BlankNode::new_unchecked(id.as_str())),
            Self::Literal(value) => write!(f, "{}", Literal::new_simple_literal(value.as_str())),
        }
    }
}

/// A single quad.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Resource,
    pub predicate: Iri,
    pub object: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Iri>,
}

impl Statement {
    #[must_use]
    pub fn new(
        subject: impl Into<Resource>,
        predicate: Iri,
        object: impl Into<Value>,
        context: Option<Iri>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
            context,
        }
    }

    /// Creates a statement in the default graph.
    #[must_use]
    pub fn triple(subject: impl Into<Resource>, predicate: Iri, object: impl Into<Value>) -> Self {
        Self::new(subject, predicate, object, None)
    }

    /// Moves the statement into another context.
    #[must_use]
    pub fn in_context(mut self, context: Option<Iri>) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn matches(&self, pattern: &Pattern) -> bool {
        pattern.subject.as_ref().map_or(true, |s| *s == self.subject)
            && pattern
                .predicate
                .as_ref()
                .map_or(true, |p| *p == self.predicate)
            && pattern.object.as_ref().map_or(true, |o| *o == self.object)
            && pattern
                .context
                .as_ref()
                .map_or(true, |c| self.context.as_ref() == Some(c))
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate.to_named_node(), self.object)?;
        if let Some(context) = &self.context {
            write!(f, " {}", context.to_named_node())?;
        }
        f.write_str(" .")
    }
}

/// Statement selector where every `None` position is a wildcard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pattern {
    pub subject: Option<Resource>,
    pub predicate: Option<Iri>,
    pub object: Option<Value>,
    pub context: Option<Iri>,
}

impl Pattern {
    /// Matches every statement.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Matches every statement of one context.
    #[must_use]
    pub fn in_context(context: &Iri) -> Self {
        Self::any().context(context.clone())
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<Resource>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn predicate(mut self, predicate: Iri) -> Self {
        self.predicate = Some(predicate);
        self
    }

    #[must_use]
    pub fn object(mut self, object: impl Into<Value>) -> Self {
        self.object = Some(object.into());
        self
    }

    #[must_use]
    pub fn context(mut self, context: Iri) -> Self {
        self.context = Some(context);
        self
    }
}

/// An ordered, duplicate-free set of statements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Graph {
    statements: BTreeSet<Statement>,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a statement, returning `false` when it was already present.
    pub fn insert(&mut self, statement: Statement) -> bool {
        self.statements.insert(statement)
    }

    /// Removes every statement matching `pattern`.
    pub fn remove_matching(&mut self, pattern: &Pattern) -> usize {
        let before = self.statements.len();
        self.statements.retain(|statement| !statement.matches(pattern));
        before - self.statements.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter()
    }

    pub fn filter<'a>(&'a self, pattern: &'a Pattern) -> impl Iterator<Item = &'a Statement> + 'a {
        self.statements.iter().filter(move |s| s.matches(pattern))
    }

    #[must_use]
    pub fn contains(&self, pattern: &Pattern) -> bool {
        self.statements.iter().any(|s| s.matches(pattern))
    }

    /// IRI objects of matching statements, deduplicated and ordered.
    #[must_use]
    pub fn object_iris(&self, pattern: &Pattern) -> Vec<Iri> {
        let found: BTreeSet<Iri> = self
            .filter(pattern)
            .filter_map(|s| s.object.as_iri().cloned())
            .collect();
        found.into_iter().collect()
    }

    /// IRI subjects of matching statements, deduplicated and ordered.
    #[must_use]
    pub fn subject_iris(&self, pattern: &Pattern) -> Vec<Iri> {
        let found: BTreeSet<Iri> = self
            .filter(pattern)
            .filter_map(|s| s.subject.as_iri().cloned())
            .collect();
        found.into_iter().collect()
    }

    /// Returns a copy with every statement moved into `context`.
    #[must_use]
    pub fn with_context(&self, context: Option<&Iri>) -> Self {
        self.statements
            .iter()
            .cloned()
            .map(|s| s.in_context(context.cloned()))
            .collect()
    }

    #[must_use]
    pub fn into_statements(self) -> Vec<Statement> {
        self.statements.into_iter().collect()
    }
}

impl FromIterator<Statement> for Graph {
    fn from_iter<T: IntoIterator<Item = Statement>>(iter: T) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}

impl Extend<Statement> for Graph {
    fn extend<T: IntoIterator<Item = Statement>>(&mut self, iter: T) {
        self.statements.extend(iter);
    }
}

impl IntoIterator for Graph {
    type Item = Statement;
    type IntoIter = std::collections::btree_set::IntoIter<Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}

impl<'a> IntoIterator for &'a Graph {
    type Item = &'a Statement;
    type IntoIter = std::collections::btree_set::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}
