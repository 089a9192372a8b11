//! Integration tests for the full pipeline
//!
//! Each test drives every stage through the library API, on files in a
//! temporary workspace:
//! - preprocess -> RNR draft -> scripted review -> RML
//! - builtin materialization -> reasoning -> controller configuration

#[path = "../common/mod.rs"]
mod common;

use common::*;
use kgctl_core::controller::{ControllerEntry, ControllerMode};
use kgctl_core::ontology::OntologyIndex;
use kgctl_core::rdfio;
use kgctl_core::rnr::{model::is_marked, RnrBuilder, RnrDocument};
use kgctl_core::KgError;
use oxigraph::model::{Subject, Term, Triple};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

fn triples(path: &Path) -> Vec<Triple> {
    rdfio::read_document(path).unwrap().0
}

fn subjects(graph: &[Triple]) -> BTreeSet<String> {
    graph
        .iter()
        .filter_map(|t| match &t.subject {
            Subject::NamedNode(n) => Some(n.as_str().to_string()),
            _ => None,
        })
        .collect()
}

fn has_triple(graph: &[Triple], s: &str, p: &str, o: &str) -> bool {
    graph.iter().any(|t| {
        matches!(&t.subject, Subject::NamedNode(n) if n.as_str() == s)
            && t.predicate.as_str() == p
            && matches!(&t.object, Term::NamedNode(n) if n.as_str() == o)
    })
}

const BRICK: &str = "https://brickschema.org/schema/Brick#";
const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

#[test]
fn test_two_room_hotel_with_co2_sensors() {
    let ws = Workspace::new();
    let run = run_pipeline(&ws, &hotel_dump(&[RoomSensor::Co2]));

    // Preprocessing: one extra node per fan
    let entities = read_array(&run.entities);
    let extras: Vec<&serde_json::Value> = entities
        .iter()
        .filter(|e| e["type"] == "airFlowSetpoint_FreshAirVentilation")
        .collect();
    assert_eq!(extras.len(), 2);
    assert_eq!(extras[0]["relatedTo"]["value"], "FreshAirVentilation:r1");
    assert_eq!(extras[0]["extra_node"], true);
    assert_eq!(extras[0]["airFlowSetpoint"], 300);

    // RNR draft: one record per type, every class awaiting review
    let draft = RnrDocument::load(&run.draft).unwrap();
    let natural: BTreeSet<&str> = draft
        .nodetypes()
        .filter(|t| !t.starts_with("airFlowSetpoint_"))
        .collect();
    assert_eq!(natural.len(), 5);
    assert_eq!(draft.data.len(), 6);
    assert!(draft.data.iter().all(|r| is_marked(&r.class)));
    let room = draft.record("HotelRoom").unwrap();
    assert_eq!(room.has_relationship.len(), 1);
    assert_eq!(room.has_relationship[0].related_node_type.as_deref(), Some("Hotel"));
    assert_eq!(room.has_relationship[0].raw_data_identifier, "hasLocation.value");
    assert!(draft.context.get("brick").is_some());

    // KG: every entity is a subject under the base namespace
    let kg = triples(&run.kg);
    let kg_subjects = subjects(&kg);
    assert!(kg_subjects.len() >= 9, "only {} subjects", kg_subjects.len());
    assert!(kg_subjects.contains(&entity_iri("HotelRoom", "HotelRoom:r1")));
    assert!(has_triple(
        &kg,
        &entity_iri("airFlowSetpoint_FreshAirVentilation", "airFlowSetpoint_FreshAirVentilation:r1"),
        &format!("{}isPointOf", BRICK),
        &entity_iri("FreshAirVentilation", "FreshAirVentilation:r1"),
    ));

    // iKG: inverse and subclass inferences are present
    let ikg = triples(&run.ikg);
    assert!(has_triple(
        &ikg,
        &entity_iri("FreshAirVentilation", "FreshAirVentilation:r2"),
        &format!("{}hasPoint", BRICK),
        &entity_iri("airFlowSetpoint_FreshAirVentilation", "airFlowSetpoint_FreshAirVentilation:r2"),
    ));
    assert!(has_triple(
        &ikg,
        &entity_iri("airFlowSetpoint_FreshAirVentilation", "airFlowSetpoint_FreshAirVentilation:r1"),
        RDF_TYPE,
        &format!("{}Setpoint", BRICK),
    ));

    // Controller configuration: both rooms in co2 mode
    let entries: Vec<ControllerEntry> =
        serde_yaml::from_str(&fs::read_to_string(&run.controllers).unwrap()).unwrap();
    assert_eq!(entries, run.report.entries);
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.controller_mode == ControllerMode::Co2));
    assert!(entries.iter().all(|e| e.controller_function == "Ventilation"));

    let first = &entries[0];
    assert_eq!(first.room, entity_iri("HotelRoom", "HotelRoom:r1"));
    assert_eq!(
        first.inputs.sensor_access.as_deref(),
        Some("http://api.hotel.org/v2/entities/CO2Sensor:r1/attrs/co2")
    );
    assert_eq!(
        first.outputs.actuation_access.as_deref(),
        Some("http://api.hotel.org/v2/entities/airFlowSetpoint_FreshAirVentilation:r1/attrs/airFlowSetpoint")
    );
}

#[test]
fn test_presence_only_rooms() {
    let ws = Workspace::new();
    let run = run_pipeline(&ws, &hotel_dump(&[RoomSensor::Presence]));

    assert_eq!(run.report.entries.len(), 2);
    for entry in &run.report.entries {
        assert_eq!(entry.controller_mode, ControllerMode::Presence);
        let access = entry.inputs.sensor_access.as_deref().unwrap();
        assert!(access.ends_with("/attrs/occupied"), "unexpected access {}", access);
    }
}

#[test]
fn test_co2_preferred_over_presence() {
    let ws = Workspace::new();
    let run = run_pipeline(&ws, &hotel_dump(&[RoomSensor::Presence, RoomSensor::Co2]));

    assert_eq!(run.report.entries.len(), 2);
    assert!(run.report.entries.iter().all(|e| e.controller_mode == ControllerMode::Co2));
}

#[test]
fn test_rooms_without_sensors_use_timetable() {
    let ws = Workspace::new();
    let run = run_pipeline(&ws, &hotel_dump(&[]));

    assert_eq!(run.report.entries.len(), 2);
    for entry in &run.report.entries {
        assert_eq!(entry.controller_mode, ControllerMode::Timetable);
        assert_eq!(entry.inputs.sensor_access, None);
        assert!(entry.outputs.actuation_access.is_some());
    }

    let yaml = fs::read_to_string(&run.controllers).unwrap();
    assert!(yaml.contains("sensor_access: null"));
}

#[test]
fn test_nested_list_reference() {
    let ws = Workspace::new();
    let dump = serde_json::json!([
        {"id": "a1", "type": "Assembly", "refs": ["x", "b1"]},
        {"id": "b1", "type": "Part"}
    ]);
    let run = run_pipeline(&ws, &dump);

    let draft = RnrDocument::load(&run.draft).unwrap();
    let assembly = draft.record("Assembly").unwrap();
    assert_eq!(assembly.has_relationship.len(), 1);
    assert_eq!(assembly.has_relationship[0].raw_data_identifier, "refs");
    assert_eq!(assembly.has_relationship[0].related_node_type.as_deref(), Some("Part"));

    let kg = triples(&run.kg);
    assert!(has_triple(
        &kg,
        &entity_iri("Assembly", "a1"),
        "http://example.com/onto#refersTo",
        &entity_iri("Part", "b1"),
    ));

    // no rooms anywhere
    assert!(run.report.entries.is_empty());
}

#[test]
fn test_room_merged_across_namespaces() {
    let ws = Workspace::new();
    let dir = ws.ontology_dir();
    fs::write(dir.join("REC.ttl"), REC_TTL).unwrap();

    let index = OntologyIndex::build(&[dir], None).unwrap();
    let room = index.class("Room").unwrap();
    assert_eq!(room.sources.len(), 2);
    assert_eq!(room.uri, format!("{}Room", BRICK));
    // a definition outranks a comment
    assert_eq!(
        room.description.as_deref(),
        Some("Part of the interior of a building enclosed by walls")
    );
    assert!(index.prefixes().get("rec").is_some());
    assert!(index.class("Space").is_some());

    let suggestion = index.suggest_class("Room", index.prefixes()).unwrap();
    assert_eq!(suggestion.best(), Some("brick:Room"));
}

#[test]
fn test_rnr_overwrite_guard() {
    let ws = Workspace::new();
    let input = ws.write_json("platform.json", &hotel_dump(&[RoomSensor::Co2]));
    let entities = ws.path("preprocessed.json");
    kgctl_core::preprocess_file(&input, &platform_config(), &entities).unwrap();
    let index = OntologyIndex::build(&[ws.ontology_dir()], None).unwrap();

    let rnr = ws.path("rnr.json");
    fs::write(&rnr, "{\"reviewed\": true}").unwrap();

    let err = RnrBuilder::new(&index).build_file(&entities, &rnr, false).unwrap_err();
    assert!(matches!(err, KgError::Overwrite(_)));
    assert_eq!(fs::read_to_string(&rnr).unwrap(), "{\"reviewed\": true}");

    let doc = RnrBuilder::new(&index).build_file(&entities, &rnr, true).unwrap();
    assert_eq!(RnrDocument::load(&rnr).unwrap(), doc);
}

#[test]
fn test_empty_dump_gives_empty_artifacts() {
    let ws = Workspace::new();
    let run = run_pipeline(&ws, &serde_json::json!([]));

    assert!(read_array(&run.entities).is_empty());
    assert!(RnrDocument::load(&run.draft).unwrap().data.is_empty());
    assert!(triples(&run.kg).is_empty());
    assert!(triples(&run.ikg).is_empty());
    assert!(run.report.entries.is_empty());

    let entries: Vec<ControllerEntry> =
        serde_yaml::from_str(&fs::read_to_string(&run.controllers).unwrap()).unwrap();
    assert!(entries.is_empty());
}

#[test]
fn test_index_sidecar_reused() {
    let ws = Workspace::new();
    let dir = ws.ontology_dir();

    let first = OntologyIndex::build(&[dir.clone()], None).unwrap();
    assert!(dir.join("Brick_index.json").exists());

    let second = OntologyIndex::build(&[dir], None).unwrap();
    assert_eq!(first.classes().count(), second.classes().count());
    assert_eq!(first.prefixes(), second.prefixes());
}
