use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::value_objects::Iri;
use crate::{Error, Result};

/// Identity of one ontology revision.
///
/// An identity pairs the stable ontology IRI with an optional version IRI and
/// an optional inferred ontology IRI. An inferred IRI is only meaningful for a
/// concrete version, so it can never be set without one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionedOntologyId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ontology_iri: Option<Iri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version_iri: Option<Iri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inferred_iri: Option<Iri>,
}

impl VersionedOntologyId {
    /// Validates the three components of an identity.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedIdentity`] when an inferred IRI is supplied without a
    /// version IRI, or a version is supplied for an anonymous ontology.
    pub fn try_new(
        ontology_iri: Option<Iri>,
        version_iri: Option<Iri>,
        inferred_iri: Option<Iri>,
    ) -> Result<Self> {
        if ontology_iri.is_none() && version_iri.is_some() {
            return Err(Error::malformed("an anonymous ontology cannot carry a version"));
        }
        if version_iri.is_none() {
            if let Some(inferred) = &inferred_iri {
                return Err(Error::malformed(format!(
                    "inferred ontology `{inferred}` has no version to derive from"
                )));
            }
        }
        Ok(Self {
            ontology_iri,
            version_iri,
            inferred_iri,
        })
    }

    /// An identity without a version.
    #[must_use]
    pub fn unversioned(ontology_iri: Iri) -> Self {
        Self {
            ontology_iri: Some(ontology_iri),
            version_iri: None,
            inferred_iri: None,
        }
    }

    #[must_use]
    pub fn versioned(ontology_iri: Iri, version_iri: Iri) -> Self {
        Self {
            ontology_iri: Some(ontology_iri),
            version_iri: Some(version_iri),
            inferred_iri: None,
        }
    }

    /// An identity whose ontology IRI is absent. It encodes to nothing.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            ontology_iri: None,
            version_iri: None,
            inferred_iri: None,
        }
    }

    /// Attaches an inferred ontology IRI.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedIdentity`] when the identity has no version.
    pub fn with_inferred(self, inferred_iri: Iri) -> Result<Self> {
        Self::try_new(self.ontology_iri, self.version_iri, Some(inferred_iri))
    }

    #[must_use]
    pub fn without_inferred(&self) -> Self {
        Self {
            ontology_iri: self.ontology_iri.clone(),
            version_iri: self.version_iri.clone(),
            inferred_iri: None,
        }
    }

    #[must_use]
    pub fn ontology_iri(&self) -> Option<&Iri> {
        self.ontology_iri.as_ref()
    }

    #[must_use]
    pub fn version_iri(&self) -> Option<&Iri> {
        self.version_iri.as_ref()
    }

    #[must_use]
    pub fn inferred_iri(&self) -> Option<&Iri> {
        self.inferred_iri.as_ref()
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.ontology_iri.is_none()
    }

    /// Returns the ontology and version IRIs, failing when either is absent.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedIdentity`] for anonymous or unversioned identities.
    pub fn require_version(&self) -> Result<(&Iri, &Iri)> {
        match (&self.ontology_iri, &self.version_iri) {
            (Some(ontology), Some(version)) => Ok((ontology, version)),
            _ => Err(Error::malformed(format!(
                "`{self}` lacks an ontology/version pair"
            ))),
        }
    }

    /// Compares ontology and version IRIs only, ignoring the inferred IRI.
    #[must_use]
    pub fn version_equivalent(&self, other: &Self) -> bool {
        self.ontology_iri == other.ontology_iri && self.version_iri == other.version_iri
    }
}

impl Display for VersionedOntologyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.ontology_iri {
            Some(ontology) => write!(f, "<{ontology}>")?,
            None => f.write_str("<anonymous>")?,
        }
        if let Some(version) = &self.version_iri {
            write!(f, " version <{version}>")?;
        }
        if let Some(inferred) = &self.inferred_iri {
            write!(f, " inferred <{inferred}>")?;
        }
        Ok(())
    }
}

/// Immutable set of schema versions a repository is built to serve.
///
/// Members are unique under [`VersionedOntologyId::version_equivalent`];
/// duplicates are dropped on construction, keeping the first occurrence.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<VersionedOntologyId>", into = "Vec<VersionedOntologyId>")]
pub struct SchemaVersionSet {
    members: Vec<VersionedOntologyId>,
}

impl SchemaVersionSet {
    pub fn new(ids: impl IntoIterator<Item = VersionedOntologyId>) -> Self {
        let mut members: Vec<VersionedOntologyId> = Vec::new();
        for id in ids {
            if !members.iter().any(|member| member.version_equivalent(&id)) {
                members.push(id);
            }
        }
        Self { members }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionedOntologyId> {
        self.members.iter()
    }

    /// Returns `true` when some member is version-equivalent to `id`.
    #[must_use]
    pub fn contains(&self, id: &VersionedOntologyId) -> bool {
        self.members.iter().any(|member| member.version_equivalent(id))
    }

    /// Exact-cardinality match: every member of either set pairs with exactly
    /// one member of the other. A subset or superset is never equivalent.
    #[must_use]
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.len() == other.len()
            && pairs_once(&self.members, &other.members)
            && pairs_once(&other.members, &self.members)
    }

    /// Version IRIs of every versioned member.
    #[must_use]
    pub fn version_iris(&self) -> Vec<&Iri> {
        self.members
            .iter()
            .filter_map(VersionedOntologyId::version_iri)
            .collect()
    }
}

fn pairs_once(left: &[VersionedOntologyId], right: &[VersionedOntologyId]) -> bool {
    left.iter().all(|id| {
        right
            .iter()
            .filter(|candidate| candidate.version_equivalent(id))
            .count()
            == 1
    })
}

impl FromIterator<VersionedOntologyId> for SchemaVersionSet {
    fn from_iter<T: IntoIterator<Item = VersionedOntologyId>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl From<Vec<VersionedOntologyId>> for SchemaVersionSet {
    fn from(ids: Vec<VersionedOntologyId>) -> Self {
        Self::new(ids)
    }
}

impl From<SchemaVersionSet> for Vec<VersionedOntologyId> {
    fn from(set: SchemaVersionSet) -> Self {
        set.members
    }
}

impl<'a> IntoIterator for &'a SchemaVersionSet {
    type Item = &'a VersionedOntologyId;
    type IntoIter = std::slice::Iter<'a, VersionedOntologyId>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn id(ontology: &str, version: &str) -> VersionedOntologyId {
        VersionedOntologyId::versioned(
            Iri::new(format!("urn:test:{ontology}")).expect("iri"),
            Iri::new(format!("urn:test:{ontology}/{version}")).expect("iri"),
        )
    }

    fn set(members: &[(&str, &str)]) -> SchemaVersionSet {
        members.iter().map(|(o, v)| id(o, v)).collect()
    }

    #[test]
    fn inferred_requires_version() {
        let ontology = Iri::new("urn:test:a").expect("iri");
        let inferred = Iri::new("urn:test:inferred").expect("iri");

        let err = VersionedOntologyId::unversioned(ontology)
            .with_inferred(inferred)
            .expect_err("no version");
        assert!(matches!(err, Error::MalformedIdentity(_)));
    }

    #[test]
    fn version_equivalence_ignores_inferred() {
        let plain = id("a", "1");
        let inferred = plain
            .clone()
            .with_inferred(Iri::new("urn:test:inf").expect("iri"))
            .expect("inferred");

        assert_ne!(plain, inferred);
        assert!(plain.version_equivalent(&inferred));
        assert!(!plain.version_equivalent(&id("a", "2")));
    }

    #[rstest]
    #[case(&[("a", "1"), ("b", "1")], &[("b", "1"), ("a", "1")], true)]
    #[case(&[("a", "1"), ("b", "1")], &[("a", "1"), ("b", "1"), ("c", "1")], false)]
    #[case(&[("a", "1"), ("b", "1"), ("c", "1")], &[("a", "1"), ("b", "1")], false)]
    #[case(&[("a", "1")], &[("a", "2")], false)]
    #[case(&[], &[], true)]
    fn equivalence_is_exact(
        #[case] left: &[(&str, &str)],
        #[case] right: &[(&str, &str)],
        #[case] expected: bool,
    ) {
        assert_eq!(set(left).is_equivalent(&set(right)), expected);
    }

    #[test]
    fn duplicates_collapse() {
        let members = set(&[("a", "1"), ("a", "1"), ("b", "1")]);
        assert_eq!(members.len(), 2);
        assert!(members.contains(&id("b", "1")));
    }
}
