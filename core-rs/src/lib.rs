//! # kgctl core - building-platform JSON to knowledge graph
//!
//! Turns the JSON dump of an IoT building platform into an ontology-aligned
//! knowledge graph and derives ventilation controller configuration from it.
//!
//! ## Pipeline
//!
//! ```text
//! platform JSON ──preprocess──▶ entities ──build-rnr──▶ RNR (human review)
//!                                                          │
//!                                                    generate-rml
//!                                                          ▼
//!   controller YAML ◀──controller-config── iKG ◀──reason── KG ◀──materialize── RML
//! ```
//!
//! Every stage reads its predecessor's file and writes a new artifact
//! atomically, so a run can stop and resume between any two stages. The only
//! human step is reviewing the RNR document: suggested values carry
//! [`REVIEW_MARKER`] and RML generation refuses to run while any remain.

pub mod artifact;
pub mod config;
pub mod controller;
pub mod errors;
pub mod jsonpath;
pub mod ontology;
pub mod preprocess;
pub mod rdfio;
pub mod reason;
pub mod rml;
pub mod rnr;
pub mod suggest;

pub use config::{EngineKind, PipelineConfig, PlatformConfig};
pub use controller::{ControllerEntry, ControllerMode, ControllerReport};
pub use errors::{KgError, Result};
pub use jsonpath::JsonPath;
pub use ontology::{ClassSuggestion, OntologyError, OntologyIndex, OntologyTerm, PrefixMap, TermKind};
pub use preprocess::{preprocess, preprocess_file, Entity, EntityKind, PreprocessSummary};
pub use reason::{reason, ReasonSummary};
pub use rml::{materialize, MaterializeSummary, RmlDocument, RmlEngine, RmlGenerator};
pub use rnr::{RnrBuilder, RnrDocument, RnrProblem, RnrRecord, REVIEW_MARKER};
pub use suggest::{EndpointMatch, IndexSuggester, SuggestionService};

/// Crate version, printed by `kgctl --version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
