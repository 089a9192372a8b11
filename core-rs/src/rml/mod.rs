/**
 * rml module
 *
 * - model: typed RML document, written as Turtle in one pass
 * - template: `{ref}` string templates with IRI-safe expansion
 * - parse: Turtle mapping back into the typed model
 * - generator: RNR document -> mapping
 * - engine: pluggable executors (in-process and morph-kgc)
 * - materialize: engine run + IRI decoding + KG write
 */

pub mod engine;
pub mod generator;
pub mod materialize;
pub mod model;
pub mod parse;
pub mod template;

pub use engine::{engine_for, BuiltinEngine, MorphKgcEngine, RmlEngine};
pub use generator::RmlGenerator;
pub use materialize::{materialize, MaterializeSummary};
pub use model::{JoinCondition, LogicalSource, ObjectMap, PredicateObjectMap, RmlDocument, SubjectMap, TermType, TriplesMap};
pub use parse::parse_mapping;
pub use template::Template;
