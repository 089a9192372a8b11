// Knowledge Graph Contract Tests
//
// The controller generator only sees the iKG. Entities must be addressable
// by their canonical IRI, and reasoning must neither leak ontology-only
// triples nor drift between runs.

use crate::common::*;
use kgctl_core::rdfio;
use kgctl_core::reason::{self, node_snapshot};
use oxigraph::model::{Subject, Term};
use std::collections::HashSet;
use std::fs;

/// KG: every preprocessed entity is the subject of `<base>/<type>/<id>`
#[test]
fn every_entity_has_a_subject() {
    let ws = Workspace::new();
    let run = run_pipeline(&ws, &hotel_dump(&[RoomSensor::Co2]));

    let (kg, _) = rdfio::read_document(&run.kg).unwrap();
    let subjects: HashSet<String> = kg
        .iter()
        .filter_map(|t| match &t.subject {
            Subject::NamedNode(n) => Some(n.as_str().to_string()),
            _ => None,
        })
        .collect();

    for entity in read_array(&run.entities) {
        let iri = entity_iri(entity["type"].as_str().unwrap(), entity["id"].as_str().unwrap());
        assert!(subjects.contains(&iri), "no triple about {}", iri);
    }
}

/// iKG: every triple has its subject or object among the KG's nodes
#[test]
fn inferred_graph_is_node_local() {
    let ws = Workspace::new();
    let run = run_pipeline(&ws, &hotel_dump(&[RoomSensor::Co2]));

    let (kg, _) = rdfio::read_document(&run.kg).unwrap();
    let (ikg, _) = rdfio::read_document(&run.ikg).unwrap();
    let nodes = node_snapshot(&kg);

    assert!(ikg.len() > kg.len());
    for triple in &ikg {
        assert!(
            nodes.contains(&Term::from(triple.subject.clone())) || nodes.contains(&triple.object),
            "triple does not touch the KG: {}",
            triple
        );
    }
}

/// iKG keeps every asserted triple
#[test]
fn inferred_graph_contains_the_kg() {
    let ws = Workspace::new();
    let run = run_pipeline(&ws, &hotel_dump(&[RoomSensor::Presence]));

    let (kg, _) = rdfio::read_document(&run.kg).unwrap();
    let (ikg, _) = rdfio::read_document(&run.ikg).unwrap();
    let inferred: HashSet<_> = ikg.into_iter().collect();
    for triple in &kg {
        assert!(inferred.contains(triple), "lost {}", triple);
    }
}

/// Reasoning the same KG twice yields the same iKG, byte for byte
#[test]
fn reasoning_is_idempotent() {
    let ws = Workspace::new();
    let run = run_pipeline(&ws, &hotel_dump(&[RoomSensor::Co2]));

    let again = ws.path("kg_again.ttl");
    reason::reason(&run.kg, &[ws.path("ontology")], Some(&again)).unwrap();
    assert_eq!(fs::read(&run.ikg).unwrap(), fs::read(&again).unwrap());
}

/// Namespace bindings of the KG survive reasoning
#[test]
fn inferred_graph_keeps_prefixes() {
    let ws = Workspace::new();
    let run = run_pipeline(&ws, &hotel_dump(&[]));

    let text = fs::read_to_string(&run.ikg).unwrap();
    assert!(text.contains("@prefix brick: <https://brickschema.org/schema/Brick#>"));
}
