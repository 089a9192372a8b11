/**
 * validate.rs
 * Checks an RNR document must pass before RML generation
 */

use std::collections::HashSet;
use std::fmt;

use super::model::{is_marked, RnrDocument};
use crate::errors::{KgError, Result};
use crate::ontology::PrefixMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RnrProblem {
    DuplicateNodetype(String),
    ReviewMarker { nodetype: String, field: String },
    UnresolvedRelatedType { nodetype: String, related: String },
    MissingPropertyClass { nodetype: String, related: String },
    UnresolvedTerm { nodetype: String, field: String, value: String },
}

impl fmt::Display for RnrProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RnrProblem::DuplicateNodetype(nodetype) => {
                write!(f, "nodetype '{}' appears more than once", nodetype)
            }
            RnrProblem::ReviewMarker { nodetype, field } => {
                write!(f, "'{}': {} still carries the review marker", nodetype, field)
            }
            RnrProblem::UnresolvedRelatedType { nodetype, related } => write!(
                f,
                "'{}': relatedNodeType '{}' does not name a record",
                nodetype, related
            ),
            RnrProblem::MissingPropertyClass { nodetype, related } => write!(
                f,
                "'{}': relationship to '{}' has no propertyClass",
                nodetype, related
            ),
            RnrProblem::UnresolvedTerm { nodetype, field, value } => write!(
                f,
                "'{}': {} '{}' is neither an IRI nor a known prefixed name",
                nodetype, field, value
            ),
        }
    }
}

/// Every problem in the document; empty when it is ready for RML generation.
///
/// `extra_prefixes` are bindings the mapping always declares (rr, rml, ql, rdf).
pub fn check(doc: &RnrDocument, extra_prefixes: &PrefixMap) -> Vec<RnrProblem> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();
    let nodetypes: HashSet<&str> = doc.nodetypes().collect();

    let resolvable = |value: &str| is_absolute_iri(value) || {
        value
            .split_once(':')
            .map_or(false, |(prefix, _)| {
                doc.context.get(prefix).is_some() || extra_prefixes.get(prefix).is_some()
            })
    };

    for record in &doc.data {
        let nodetype = &record.nodetype;
        if !seen.insert(nodetype.as_str()) {
            problems.push(RnrProblem::DuplicateNodetype(nodetype.clone()));
        }

        if is_marked(&record.class) {
            problems.push(RnrProblem::ReviewMarker {
                nodetype: nodetype.clone(),
                field: "class".to_string(),
            });
        } else if !resolvable(&record.class) {
            problems.push(RnrProblem::UnresolvedTerm {
                nodetype: nodetype.clone(),
                field: "class".to_string(),
                value: record.class.clone(),
            });
        }

        if record.has_data_access.as_deref().map_or(false, is_marked) {
            problems.push(RnrProblem::ReviewMarker {
                nodetype: nodetype.clone(),
                field: "hasDataAccess".to_string(),
            });
        }

        for rel in &record.has_relationship {
            let Some(related) = &rel.related_node_type else { continue };

            if !nodetypes.contains(related.as_str()) {
                problems.push(RnrProblem::UnresolvedRelatedType {
                    nodetype: nodetype.clone(),
                    related: related.clone(),
                });
            }

            match &rel.property_class {
                None => problems.push(RnrProblem::MissingPropertyClass {
                    nodetype: nodetype.clone(),
                    related: related.clone(),
                }),
                Some(property) if is_marked(property) => problems.push(RnrProblem::ReviewMarker {
                    nodetype: nodetype.clone(),
                    field: format!("propertyClass of relationship to '{}'", related),
                }),
                Some(property) if !resolvable(property) => problems.push(RnrProblem::UnresolvedTerm {
                    nodetype: nodetype.clone(),
                    field: "propertyClass".to_string(),
                    value: property.clone(),
                }),
                Some(_) => {}
            }
        }
    }

    problems
}

/// Fail with `RnrValidation` listing every problem
pub fn validate(doc: &RnrDocument, extra_prefixes: &PrefixMap) -> Result<()> {
    let problems = check(doc, extra_prefixes);
    if problems.is_empty() {
        return Ok(());
    }
    let listing = problems
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(KgError::RnrValidation(listing))
}

pub fn is_absolute_iri(value: &str) -> bool {
    let value = value.trim();
    (value.starts_with('<') && value.ends_with('>')) || value.contains("://") || value.starts_with("urn:")
}
