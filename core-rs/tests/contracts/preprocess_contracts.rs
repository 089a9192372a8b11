// Preprocessed JSON Contract Tests
//
// The preprocessed array is the only input of both the RNR builder and the
// materializer. Every object is addressable by id and type, and every extra
// node points back at a natural object.

use crate::common::*;
use kgctl_core::config::PlatformConfig;
use kgctl_core::preprocess::{preprocess, read_entities, EntityKind};
use kgctl_core::rnr::builder::{detect_relationships, first_of_each_type};
use serde_json::json;
use std::collections::{HashMap, HashSet};

/// BREAKS: RML subject templates `<base>/<type>/{id}` if id or type is missing
#[test]
fn every_object_has_id_and_type() {
    let (entities, _) = preprocess(&hotel_dump(&[RoomSensor::Co2, RoomSensor::Presence]), &platform_config()).unwrap();
    assert!(!entities.is_empty());

    for entity in &entities {
        let object = entity.to_json();
        assert!(
            object["id"].as_str().map_or(false, |s| !s.is_empty()),
            "object without id: {}",
            object
        );
        assert!(
            object["type"].as_str().map_or(false, |s| !s.is_empty()),
            "object without type: {}",
            object
        );
    }
}

/// BREAKS: extra-node relationships in the KG if relatedTo dangles
#[test]
fn extra_nodes_point_at_natural_objects() {
    let ws = Workspace::new();
    let input = ws.write_json("platform.json", &hotel_dump(&[RoomSensor::Co2]));
    let output = ws.path("preprocessed.json");
    kgctl_core::preprocess_file(&input, &platform_config(), &output).unwrap();

    let entities = read_entities(&output).unwrap();
    let natural: HashSet<&str> = entities
        .iter()
        .filter(|e| e.kind == EntityKind::Natural)
        .map(|e| e.id.as_str())
        .collect();

    let extras: Vec<_> = entities.iter().filter(|e| e.is_extra_node()).collect();
    assert_eq!(extras.len(), 2);
    for extra in extras {
        let parent = extra.parent_id().unwrap();
        assert!(natural.contains(parent), "extra node {} points at {}", extra.id, parent);
        assert_eq!(extra.payload["relatedTo"]["value"], parent);
        assert_eq!(extra.payload["extra_node"], true);
    }
}

/// Output order: original order, extra nodes immediately after their parent
#[test]
fn extra_nodes_follow_their_parent() {
    let (entities, _) = preprocess(&hotel_dump(&[]), &platform_config()).unwrap();
    for (position, entity) in entities.iter().enumerate() {
        if let Some(parent) = entity.parent_id() {
            assert_eq!(entities[position - 1].id, parent);
        }
    }
}

#[test]
fn extra_node_path_matching_nothing_synthesizes_nothing() {
    let config = PlatformConfig::new("id", vec!["type".to_string()], vec!["$.doesNotExist".to_string()]);
    let (entities, summary) = preprocess(&hotel_dump(&[RoomSensor::Co2]), &config).unwrap();
    assert_eq!(summary.synthesized, 0);
    assert!(entities.iter().all(|e| !e.is_extra_node()));
}

#[test]
fn empty_dump_gives_empty_array() {
    let (entities, summary) = preprocess(&json!([]), &platform_config()).unwrap();
    assert!(entities.is_empty());
    assert_eq!(summary.natural + summary.synthesized + summary.skipped, 0);
}

/// Scalar equality is by string form unless only JSON strings may match
#[test]
fn numeric_id_coincidence_follows_strict_toggle() {
    let dump = json!([
        {"id": "s1", "type": "Sensor", "floor": 3},
        {"id": "3", "type": "Floor"}
    ]);
    let (entities, _) = preprocess(&dump, &platform_config()).unwrap();
    let ids: HashMap<&str, &str> = entities.iter().map(|e| (e.id.as_str(), e.entity_type.as_str())).collect();

    let sensor = first_of_each_type(&entities)[0];
    assert_eq!(detect_relationships(sensor, &ids, false).len(), 1);
    assert!(detect_relationships(sensor, &ids, true).is_empty());
}
