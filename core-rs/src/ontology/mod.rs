/**
 * ontology module
 *
 * - index: per-file term extraction, merged OntologyIndex, sidecar cache
 * - prefixes: prefix extraction and URI <-> CURIE conversion
 * - query: SPARQL query builders over an oxigraph Store
 * - similarity: indel ratio used by fuzzy suggestions
 * - vocab: RDF/RDFS/OWL/RML term constants
 */

pub mod index;
pub mod prefixes;
pub mod query;
pub mod similarity;
pub mod vocab;

use thiserror::Error;

pub use index::{ClassSuggestion, FileIndex, OntologyIndex, OntologyTerm, TermKind};
pub use prefixes::PrefixMap;
pub use query::{QueryRow, SparqlQuery};

#[derive(Error, Debug)]
pub enum OntologyError {
    #[error("Failed to load ontology: {0}")]
    LoadError(String),

    #[error("Failed to parse RDF: {0}")]
    ParseError(String),

    #[error("Ontology not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Oxigraph error: {0}")]
    StoreError(String),

    #[error("Unsupported ontology format: {0}")]
    UnsupportedFormat(String),

    #[error("No prefix binding covers {0}")]
    UnresolvedPrefix(String),

    #[error("Ontology index is empty (no classes or properties loaded)")]
    OntologyEmpty,
}
