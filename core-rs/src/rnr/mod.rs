/**
 * rnr module
 *
 * - model: RNR JSON-LD document and review marker
 * - builder: one record per entity type, relationships found by id equality
 * - validate: checks run before RML generation (and by `check-rnr`)
 */

pub mod builder;
pub mod model;
pub mod validate;

pub use builder::{DetectedRelationship, RnrBuilder};
pub use model::{Relationship, RnrDocument, RnrRecord, REVIEW_MARKER};
pub use validate::{check, validate, RnrProblem};
