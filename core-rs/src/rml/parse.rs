/**
 * parse.rs
 * Read an RML Turtle mapping back into the typed model
 */

use oxigraph::io::RdfFormat;
use oxigraph::model::{Subject, Term, Triple};
use std::collections::HashMap;

use super::model::{
    JoinCondition, LogicalSource, ObjectMap, PredicateObjectMap, RmlDocument, SubjectMap, TermType, TriplesMap,
    PLACEHOLDER_SOURCE,
};
use crate::errors::{KgError, Result};
use crate::ontology::vocab::rml;
use crate::ontology::PrefixMap;
use crate::rdfio;

/// Outgoing edges per node, keyed by the node's string form
struct Graph {
    edges: HashMap<String, Vec<(String, Term)>>,
}

impl Graph {
    fn new(triples: Vec<Triple>) -> Self {
        let mut edges: HashMap<String, Vec<(String, Term)>> = HashMap::new();
        for triple in triples {
            edges
                .entry(subject_key(&triple.subject))
                .or_default()
                .push((triple.predicate.as_str().to_string(), triple.object));
        }
        Self { edges }
    }

    fn objects(&self, node: &str, predicate: &str) -> Vec<&Term> {
        self.edges
            .get(node)
            .into_iter()
            .flatten()
            .filter(|(p, _)| p == predicate)
            .map(|(_, o)| o)
            .collect()
    }

    fn object(&self, node: &str, predicate: &str) -> Option<&Term> {
        self.objects(node, predicate).into_iter().next()
    }

    fn string(&self, node: &str, predicate: &str) -> Option<String> {
        match self.object(node, predicate)? {
            Term::Literal(l) => Some(l.value().to_string()),
            _ => None,
        }
    }

    fn iri(&self, node: &str, predicate: &str) -> Option<String> {
        match self.object(node, predicate)? {
            Term::NamedNode(n) => Some(n.as_str().to_string()),
            _ => None,
        }
    }

    fn node(&self, node: &str, predicate: &str) -> Option<String> {
        self.object(node, predicate).and_then(term_key)
    }
}

fn subject_key(subject: &Subject) -> String {
    match subject {
        Subject::NamedNode(n) => n.as_str().to_string(),
        Subject::BlankNode(b) => format!("_:{}", b.as_str()),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}

fn term_key(term: &Term) -> Option<String> {
    match term {
        Term::NamedNode(n) => Some(n.as_str().to_string()),
        Term::BlankNode(b) => Some(format!("_:{}", b.as_str())),
        _ => None,
    }
}

/// Parse mapping text; every subject with an `rml:logicalSource` is a TriplesMap
pub fn parse_mapping(text: &str, origin: &str) -> Result<RmlDocument> {
    let triples = rdfio::parse_triples(text, RdfFormat::Turtle, origin)
        .map_err(|e| KgError::Materialization(e.to_string()))?;

    let mut map_nodes: Vec<String> = triples
        .iter()
        .filter(|t| t.predicate.as_ref() == rml::LOGICAL_SOURCE)
        .map(|t| subject_key(&t.subject))
        .collect();
    map_nodes.sort();
    map_nodes.dedup();

    let graph = Graph::new(triples);
    let mut triples_maps = Vec::with_capacity(map_nodes.len());
    for node in map_nodes {
        triples_maps.push(read_triples_map(&graph, &node)?);
    }

    Ok(RmlDocument {
        prefixes: PrefixMap::extract(text),
        triples_maps,
    })
}

fn read_triples_map(graph: &Graph, node: &str) -> Result<TriplesMap> {
    let missing = |what: &str| KgError::Materialization(format!("TriplesMap {} has no {}", node, what));

    let source_node = graph
        .node(node, rml::LOGICAL_SOURCE.as_str())
        .ok_or_else(|| missing("rml:logicalSource"))?;
    if let Some(formulation) = graph.iri(&source_node, rml::REFERENCE_FORMULATION.as_str()) {
        if formulation != rml::JSONPATH.as_str() {
            return Err(KgError::Materialization(format!(
                "TriplesMap {} uses unsupported reference formulation {}",
                node, formulation
            )));
        }
    }
    let logical_source = LogicalSource {
        source: graph
            .string(&source_node, rml::SOURCE.as_str())
            .unwrap_or_else(|| PLACEHOLDER_SOURCE.to_string()),
        iterator: graph
            .string(&source_node, rml::ITERATOR.as_str())
            .unwrap_or_else(|| "$".to_string()),
    };

    let subject_node = graph
        .node(node, rml::SUBJECT_MAP.as_str())
        .ok_or_else(|| missing("rr:subjectMap"))?;
    let subject_map = SubjectMap {
        template: graph
            .string(&subject_node, rml::TEMPLATE.as_str())
            .ok_or_else(|| missing("rr:template on its subject map"))?,
        classes: {
            let mut classes: Vec<String> = graph
                .objects(&subject_node, rml::CLASS.as_str())
                .into_iter()
                .filter_map(|t| match t {
                    Term::NamedNode(n) => Some(n.as_str().to_string()),
                    _ => None,
                })
                .collect();
            classes.sort();
            classes
        },
    };

    let mut predicate_object_maps = Vec::new();
    let pom_nodes: Vec<String> = graph
        .objects(node, rml::PREDICATE_OBJECT_MAP.as_str())
        .into_iter()
        .filter_map(term_key)
        .collect();
    for pom in pom_nodes {
        predicate_object_maps.extend(read_predicate_object_maps(graph, node, &pom)?);
    }
    predicate_object_maps.sort_by(|a, b| a.predicate.cmp(&b.predicate));

    Ok(TriplesMap {
        iri: node.to_string(),
        logical_source,
        subject_map,
        predicate_object_maps,
    })
}

/// One entry per (predicate, object map) pair of a `rr:predicateObjectMap` node
fn read_predicate_object_maps(graph: &Graph, map: &str, pom: &str) -> Result<Vec<PredicateObjectMap>> {
    let mut predicates: Vec<String> = graph
        .objects(pom, rml::PREDICATE.as_str())
        .into_iter()
        .filter_map(|t| match t {
            Term::NamedNode(n) => Some(n.as_str().to_string()),
            _ => None,
        })
        .collect();
    for predicate_map in graph.objects(pom, rml::PREDICATE_MAP.as_str()).into_iter().filter_map(term_key) {
        if let Some(constant) = graph.iri(&predicate_map, rml::CONSTANT.as_str()) {
            predicates.push(constant);
        }
    }
    if predicates.is_empty() {
        return Err(KgError::Materialization(format!(
            "predicateObjectMap of {} has no predicate",
            map
        )));
    }

    let mut object_maps = Vec::new();
    for object in graph.objects(pom, rml::OBJECT.as_str()) {
        if let Term::NamedNode(n) = object {
            object_maps.push(ObjectMap::Constant(n.as_str().to_string()));
        }
    }
    for object_node in graph.objects(pom, rml::OBJECT_MAP.as_str()).into_iter().filter_map(term_key) {
        object_maps.push(read_object_map(graph, map, &object_node)?);
    }
    if object_maps.is_empty() {
        return Err(KgError::Materialization(format!(
            "predicateObjectMap of {} has no object map",
            map
        )));
    }

    let mut out = Vec::new();
    for predicate in &predicates {
        for object_map in &object_maps {
            out.push(PredicateObjectMap {
                predicate: predicate.clone(),
                object_map: object_map.clone(),
            });
        }
    }
    Ok(out)
}

fn read_object_map(graph: &Graph, map: &str, node: &str) -> Result<ObjectMap> {
    let term_type = graph.iri(node, rml::TERM_TYPE.as_str());
    let is = |expected: &str| term_type.as_deref() == Some(expected);

    if let Some(parent) = graph.node(node, rml::PARENT_TRIPLES_MAP.as_str()) {
        let mut join_conditions = Vec::new();
        for join in graph.objects(node, rml::JOIN_CONDITION.as_str()).into_iter().filter_map(term_key) {
            let child = graph.string(&join, rml::CHILD.as_str());
            let parent_ref = graph.string(&join, rml::PARENT.as_str());
            match (child, parent_ref) {
                (Some(child), Some(parent)) => join_conditions.push(JoinCondition { child, parent }),
                _ => {
                    return Err(KgError::Materialization(format!(
                        "join condition in {} needs both rr:child and rr:parent",
                        map
                    )))
                }
            }
        }
        join_conditions.sort_by(|a, b| a.child.cmp(&b.child).then_with(|| a.parent.cmp(&b.parent)));
        return Ok(ObjectMap::Parent {
            parent,
            join_conditions,
        });
    }
    if let Some(template) = graph.string(node, rml::TEMPLATE.as_str()) {
        let term_type = if is(rml::LITERAL.as_str()) {
            TermType::Literal
        } else {
            TermType::Iri
        };
        return Ok(ObjectMap::Template { template, term_type });
    }
    if let Some(reference) = graph.string(node, rml::REFERENCE.as_str()) {
        let term_type = if is(rml::IRI.as_str()) {
            TermType::Iri
        } else {
            TermType::Literal
        };
        return Ok(ObjectMap::Reference {
            reference,
            term_type,
            datatype: graph.iri(node, rml::DATATYPE.as_str()),
        });
    }
    if let Some(constant) = graph.iri(node, rml::CONSTANT.as_str()) {
        return Ok(ObjectMap::Constant(constant));
    }
    Err(KgError::Materialization(format!(
        "object map in {} has no parentTriplesMap, template, reference or constant",
        map
    )))
}
