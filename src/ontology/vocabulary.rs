//! Vocabulary used by the management graphs.
//!
//! Standard terms come from RDF, OWL, OMV and Dublin Core; the bookkeeping
//! predicates for inferred versions and repository records live in the vault
//! namespace.

use super::value_objects::Iri;

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_SUB_CLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
pub const RDFS_SUB_PROPERTY_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subPropertyOf";

pub const OWL_ONTOLOGY: &str = "http://www.w3.org/2002/07/owl#Ontology";
pub const OWL_VERSION_IRI: &str = "http://www.w3.org/2002/07/owl#versionIRI";
pub const OWL_IMPORTS: &str = "http://www.w3.org/2002/07/owl#imports";

/// The OMV vocabulary already defines a current-version property.
pub const OMV_CURRENT_VERSION: &str = "http://omv.ontoware.org/ontology#currentVersion";

pub const DCTERMS_CREATED: &str = "http://purl.org/dc/terms/created";

pub const VAULT: &str = "https://w3id.org/ontology-vault/ns#";

pub const CURRENT_INFERRED_VERSION: &str =
    "https://w3id.org/ontology-vault/ns#currentInferredVersion";
pub const INFERRED_VERSION: &str = "https://w3id.org/ontology-vault/ns#inferredVersion";
pub const HAS_PUBLICATION_STATUS: &str =
    "https://w3id.org/ontology-vault/ns#hasPublicationStatus";
pub const PUBLISHED: &str = "https://w3id.org/ontology-vault/ns#Published";

pub const REPOSITORY_MANAGER: &str = "https://w3id.org/ontology-vault/ns#RepositoryManager";
pub const REPOSITORY: &str = "https://w3id.org/ontology-vault/ns#Repository";
pub const MANAGER_CONTAINS_REPOSITORY: &str =
    "https://w3id.org/ontology-vault/ns#repositoryManagerContainsRepository";
pub const MANAGER_TYPE: &str = "https://w3id.org/ontology-vault/ns#repositoryManagerType";
pub const MANAGER_TYPE_LOCAL: &str = "https://w3id.org/ontology-vault/ns#LocalRepositoryManager";
pub const MANAGER_TYPE_REMOTE: &str = "https://w3id.org/ontology-vault/ns#RemoteRepositoryManager";
pub const MANAGER_LOCAL_DIRECTORY: &str =
    "https://w3id.org/ontology-vault/ns#localRepositoryManagerDirectory";
pub const MANAGER_REMOTE_SERVER_URL: &str =
    "https://w3id.org/ontology-vault/ns#remoteRepositoryManagerServerUrl";
pub const REPOSITORY_ID_IN_MANAGER: &str =
    "https://w3id.org/ontology-vault/ns#repositoryIdInManager";
pub const REPOSITORY_CONTAINS_SCHEMA_IRI: &str =
    "https://w3id.org/ontology-vault/ns#repositoryContainsSchemaIRI";
pub const REPOSITORY_CONTAINS_SCHEMA_VERSION: &str =
    "https://w3id.org/ontology-vault/ns#repositoryContainsSchemaVersion";

pub const DEFAULT_ARTIFACT_MANAGEMENT_GRAPH: &str =
    "urn:ontology-vault:default:artifactmanagementgraph:";
pub const DEFAULT_SCHEMA_MANAGEMENT_GRAPH: &str =
    "urn:ontology-vault:default:schemamanagementgraph";
pub const DEFAULT_REPOSITORY_MANAGEMENT_GRAPH: &str =
    "urn:ontology-vault:default:repositorymanagementgraph:";
pub const DEFAULT_DATA_REPOSITORY_MANAGEMENT_GRAPH: &str =
    "urn:ontology-vault:default:datarepositorymanagementgraph:";

/// Prefix for inferred ontology IRIs. Inferred ontologies carry no version of
/// their own, so the IRI is minted from the (unique) version IRI they derive from.
pub const DEFAULT_INFERRED_PREFIX: &str = "urn:ontology-vault:inferred:ontologyiriprefix:";

pub const REPOSITORY_URN_PREFIX: &str = "urn:ontology-vault:repository:";
pub const REPOSITORY_MANAGER_URN_PREFIX: &str = "urn:ontology-vault:repositorymanager:";

/// Returns a vocabulary term as an [`Iri`].
#[must_use]
pub fn term(value: &str) -> Iri {
    Iri::known(value)
}

#[must_use]
pub fn rdf_type() -> Iri {
    term(RDF_TYPE)
}

#[must_use]
pub fn owl_ontology() -> Iri {
    term(OWL_ONTOLOGY)
}

#[must_use]
pub fn owl_version_iri() -> Iri {
    term(OWL_VERSION_IRI)
}

#[must_use]
pub fn owl_imports() -> Iri {
    term(OWL_IMPORTS)
}

#[must_use]
pub fn current_version() -> Iri {
    term(OMV_CURRENT_VERSION)
}

#[must_use]
pub fn current_inferred_version() -> Iri {
    term(CURRENT_INFERRED_VERSION)
}

#[must_use]
pub fn inferred_version() -> Iri {
    term(INFERRED_VERSION)
}

#[must_use]
pub fn has_publication_status() -> Iri {
    term(HAS_PUBLICATION_STATUS)
}
