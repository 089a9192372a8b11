/**
 * builtin.rs
 * In-process RML execution over a single JSON document
 *
 * Every logical source reads the data file given to the engine; the mapping's
 * own rml:source is ignored.
 */

use oxigraph::model::vocab::xsd;
use oxigraph::model::{Literal, NamedNode, Term, Triple};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::RmlEngine;
use crate::errors::{KgError, Result};
use crate::jsonpath::{resolve_reference, scalar_to_string, JsonPath};
use crate::ontology::vocab::rdf;
use crate::rml::model::{JoinCondition, ObjectMap, RmlDocument, TermType, TriplesMap};
use crate::rml::parse::parse_mapping;
use crate::rml::template::Template;

pub struct BuiltinEngine;

impl RmlEngine for BuiltinEngine {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn materialize(&self, mapping: &Path, data: &Path) -> Result<Vec<Triple>> {
        if !data.exists() {
            return Err(KgError::FileNotFound(data.display().to_string()));
        }
        let text = fs::read_to_string(mapping)?;
        let document = parse_mapping(&text, &mapping.display().to_string())?;
        let input: Value = serde_json::from_str(&fs::read_to_string(data)?)?;
        execute(&document, &input)
    }
}

/// A TriplesMap with its iterator already evaluated
struct PreparedMap<'a> {
    map: &'a TriplesMap,
    records: Vec<&'a Value>,
    subject: Template,
}

impl<'a> PreparedMap<'a> {
    fn subjects(&self, record: &Value) -> Vec<NamedNode> {
        self.subject
            .expand(record, true)
            .into_iter()
            .filter_map(|iri| match NamedNode::new(&iri) {
                Ok(node) => Some(node),
                Err(e) => {
                    warn!(map = %self.map.iri, iri = %iri, error = %e, "invalid subject IRI skipped");
                    None
                }
            })
            .collect()
    }
}

/// Run every TriplesMap of `document` against `input`
pub fn execute(document: &RmlDocument, input: &Value) -> Result<Vec<Triple>> {
    document.check_unique_subjects()?;

    let mut prepared: HashMap<&str, PreparedMap> = HashMap::new();
    for map in &document.triples_maps {
        let path = JsonPath::parse(&map.logical_source.iterator).map_err(|e| {
            KgError::Materialization(format!("TriplesMap {}: {}", map.iri, e))
        })?;
        let records = path.select_values(input);
        debug!(map = %map.iri, records = records.len(), "iterator evaluated");
        prepared.insert(
            map.iri.as_str(),
            PreparedMap {
                map,
                records,
                subject: Template::parse(&map.subject_map.template)?,
            },
        );
    }

    let mut out = TripleSink::default();
    for map in &document.triples_maps {
        let current = &prepared[map.iri.as_str()];
        let classes = map
            .subject_map
            .classes
            .iter()
            .map(|c| named_node(c, &map.iri))
            .collect::<Result<Vec<_>>>()?;

        for record in &current.records {
            for subject in current.subjects(record) {
                for class in &classes {
                    out.push(Triple::new(subject.clone(), rdf::TYPE, class.clone()));
                }
            }
        }

        for pom in &map.predicate_object_maps {
            let predicate = named_node(&pom.predicate, &map.iri)?;
            match &pom.object_map {
                ObjectMap::Parent {
                    parent,
                    join_conditions,
                } => {
                    let parent_map = prepared.get(parent.as_str()).ok_or_else(|| {
                        KgError::Materialization(format!(
                            "TriplesMap {} references unknown parent {}",
                            map.iri, parent
                        ))
                    })?;
                    join(current, parent_map, join_conditions, &predicate, &mut out);
                }
                object_map => {
                    for record in &current.records {
                        let objects = objects_for(object_map, record, &map.iri)?;
                        if objects.is_empty() {
                            continue;
                        }
                        for subject in current.subjects(record) {
                            for object in &objects {
                                out.push(Triple::new(subject.clone(), predicate.clone(), object.clone()));
                            }
                        }
                    }
                }
            }
        }
    }

    info!(triple_maps = document.triples_maps.len(), triples = out.triples.len(), "builtin engine finished");
    Ok(out.triples)
}

fn objects_for(object_map: &ObjectMap, record: &Value, map_iri: &str) -> Result<Vec<Term>> {
    let objects = match object_map {
        ObjectMap::Template { template, term_type } => {
            let template = Template::parse(template)?;
            match term_type {
                TermType::Iri => template
                    .expand(record, true)
                    .into_iter()
                    .filter_map(|iri| NamedNode::new(iri).ok().map(Term::from))
                    .collect(),
                TermType::Literal => template
                    .expand(record, false)
                    .into_iter()
                    .map(|s| Term::from(Literal::new_simple_literal(s)))
                    .collect(),
            }
        }
        ObjectMap::Reference {
            reference,
            term_type,
            datatype,
        } => {
            let datatype = datatype.as_deref().map(|d| named_node(d, map_iri)).transpose()?;
            resolve_reference(record, reference)
                .into_iter()
                .filter_map(|value| reference_term(value, *term_type, datatype.as_ref()))
                .collect()
        }
        ObjectMap::Constant(iri) => vec![Term::from(named_node(iri, map_iri)?)],
        ObjectMap::Parent { .. } => Vec::new(),
    };
    Ok(objects)
}

/// JSON scalar -> RDF term; numbers and booleans keep their XSD type
fn reference_term(value: &Value, term_type: TermType, datatype: Option<&NamedNode>) -> Option<Term> {
    let lexical = scalar_to_string(value)?;
    if term_type == TermType::Iri {
        return NamedNode::new(lexical).ok().map(Term::from);
    }
    if let Some(datatype) = datatype {
        return Some(Literal::new_typed_literal(lexical, datatype.clone()).into());
    }
    let literal = match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Literal::new_typed_literal(lexical, xsd::INTEGER),
        Value::Number(_) => Literal::new_typed_literal(lexical, xsd::DOUBLE),
        Value::Bool(_) => Literal::new_typed_literal(lexical, xsd::BOOLEAN),
        _ => Literal::new_simple_literal(lexical),
    };
    Some(literal.into())
}

/// Referencing object map: child subject -> parent subject
fn join(
    child: &PreparedMap,
    parent: &PreparedMap,
    conditions: &[JoinCondition],
    predicate: &NamedNode,
    out: &mut TripleSink,
) {
    if conditions.is_empty() {
        if child.map.logical_source != parent.map.logical_source {
            warn!(
                child = %child.map.iri,
                parent = %parent.map.iri,
                "parentTriplesMap without joinCondition over a different logical source skipped"
            );
            return;
        }
        for record in &child.records {
            let objects = parent.subjects(record);
            for subject in child.subjects(record) {
                for object in &objects {
                    out.push(Triple::new(subject.clone(), predicate.clone(), object.clone()));
                }
            }
        }
        return;
    }

    let parent_refs: Vec<&str> = conditions.iter().map(|c| c.parent.as_str()).collect();
    let child_refs: Vec<&str> = conditions.iter().map(|c| c.child.as_str()).collect();

    let mut index: HashMap<Vec<String>, Vec<NamedNode>> = HashMap::new();
    for record in &parent.records {
        let subjects = parent.subjects(record);
        for key in join_keys(record, &parent_refs) {
            index.entry(key).or_default().extend(subjects.iter().cloned());
        }
    }

    let mut joined = 0usize;
    for record in &child.records {
        let keys = join_keys(record, &child_refs);
        if keys.is_empty() {
            continue;
        }
        let subjects = child.subjects(record);
        for key in keys {
            let Some(objects) = index.get(&key) else {
                continue;
            };
            for subject in &subjects {
                for object in objects {
                    out.push(Triple::new(subject.clone(), predicate.clone(), object.clone()));
                    joined += 1;
                }
            }
        }
    }
    debug!(child = %child.map.iri, parent = %parent.map.iri, joined, "join resolved");
}

/// Every combination of the scalar values behind `references`
fn join_keys(record: &Value, references: &[&str]) -> Vec<Vec<String>> {
    let mut keys = vec![Vec::new()];
    for reference in references {
        let values: Vec<String> = resolve_reference(record, reference)
            .into_iter()
            .filter_map(scalar_to_string)
            .collect();
        if values.is_empty() {
            return Vec::new();
        }
        keys = keys
            .into_iter()
            .flat_map(|key| {
                values.iter().map(move |v| {
                    let mut next = key.clone();
                    next.push(v.clone());
                    next
                })
            })
            .collect();
    }
    keys
}

fn named_node(iri: &str, map_iri: &str) -> Result<NamedNode> {
    NamedNode::new(iri).map_err(|e| {
        KgError::Materialization(format!("TriplesMap {}: invalid IRI '{}': {}", map_iri, iri, e))
    })
}

/// Insertion-ordered triple set
#[derive(Default)]
struct TripleSink {
    seen: HashSet<Triple>,
    triples: Vec<Triple>,
}

impl TripleSink {
    fn push(&mut self, triple: Triple) {
        if self.seen.insert(triple.clone()) {
            self.triples.push(triple);
        }
    }
}
