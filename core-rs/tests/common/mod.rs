//! Shared fixtures for the integration and contract suites: a small Brick
//! ontology, a FIWARE-style hotel dump and a scripted RNR review.

#![allow(dead_code)]

use kgctl_core::config::{EngineKind, PlatformConfig};
use kgctl_core::controller::{self, ControllerReport};
use kgctl_core::ontology::OntologyIndex;
use kgctl_core::preprocess;
use kgctl_core::reason;
use kgctl_core::rml::{self, RmlGenerator};
use kgctl_core::rnr::{RnrBuilder, RnrDocument};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const BASE: &str = "http://example.com";
pub const API: &str = "http://api.hotel.org/v2/entities";

pub const BRICK_TTL: &str = r#"
@prefix brick: <https://brickschema.org/schema/Brick#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .

brick:Location a owl:Class ; rdfs:label "Location" .
brick:Building a owl:Class ; rdfs:subClassOf brick:Location ; rdfs:label "Building" .
brick:Room a owl:Class ; rdfs:subClassOf brick:Location ; rdfs:label "Room" ;
    skos:definition "Part of the interior of a building enclosed by walls" .

brick:Equipment a owl:Class ; rdfs:label "Equipment" .
brick:HVAC_Equipment a owl:Class ; rdfs:subClassOf brick:Equipment ; rdfs:label "HVAC Equipment" .
brick:Fan a owl:Class ; rdfs:subClassOf brick:HVAC_Equipment ; rdfs:label "Fan" .

brick:Point a owl:Class ; rdfs:label "Point" .
brick:Setpoint a owl:Class ; rdfs:subClassOf brick:Point ; rdfs:label "Setpoint" .
brick:Air_Flow_Setpoint a owl:Class ; rdfs:subClassOf brick:Setpoint ; rdfs:label "Air Flow Setpoint" .
brick:Sensor a owl:Class ; rdfs:subClassOf brick:Point ; rdfs:label "Sensor" .
brick:CO2_Sensor a owl:Class ; rdfs:subClassOf brick:Sensor ; rdfs:label "CO2 Sensor" .
brick:Temperature_Sensor a owl:Class ; rdfs:subClassOf brick:Sensor ; rdfs:label "Temperature Sensor" .
brick:Occupancy_Sensor a owl:Class ; rdfs:subClassOf brick:Sensor ; rdfs:label "Occupancy Sensor" .

brick:hasLocation a owl:ObjectProperty ; owl:inverseOf brick:isLocationOf ; rdfs:label "has location" .
brick:isLocationOf a owl:ObjectProperty ; rdfs:label "is location of" .
brick:hasPoint a owl:ObjectProperty ; owl:inverseOf brick:isPointOf ; rdfs:label "has point" .
brick:isPointOf a owl:ObjectProperty ; rdfs:label "is point of" .
"#;

pub const REC_TTL: &str = r#"
@prefix rec: <https://w3id.org/rec#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

rec:Space a owl:Class ; rdfs:label "Space" .
rec:Room a owl:Class ; rdfs:subClassOf rec:Space ; rdfs:comment "A room in a building" .
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomSensor {
    Co2,
    Presence,
}

/// One hotel, two rooms; each room has a temperature sensor, a fresh-air fan
/// with an `airFlowSetpoint`, and the requested sensors.
pub fn hotel_dump(sensors: &[RoomSensor]) -> Value {
    let mut items = vec![json!({
        "id": "Hotel:h1",
        "type": "Hotel",
        "name": {"type": "Text", "value": "Seaside"}
    })];

    for room in ["r1", "r2"] {
        let room_id = format!("HotelRoom:{}", room);
        items.push(json!({
            "id": room_id,
            "type": "HotelRoom",
            "hasLocation": {"type": "Relationship", "value": "Hotel:h1"}
        }));
        items.push(json!({
            "id": format!("TemperatureSensor:{}", room),
            "type": "TemperatureSensor",
            "temperature": {"type": "Number", "value": 21.5},
            "hasLocation": {"type": "Relationship", "value": room_id}
        }));
        for sensor in sensors {
            items.push(match sensor {
                RoomSensor::Co2 => json!({
                    "id": format!("CO2Sensor:{}", room),
                    "type": "CO2Sensor",
                    "co2": {"type": "Number", "value": 450},
                    "hasLocation": {"type": "Relationship", "value": room_id}
                }),
                RoomSensor::Presence => json!({
                    "id": format!("PresenceSensor:{}", room),
                    "type": "PresenceSensor",
                    "occupied": {"type": "Boolean", "value": false},
                    "hasLocation": {"type": "Relationship", "value": room_id}
                }),
            });
        }
        items.push(json!({
            "id": format!("FreshAirVentilation:{}", room),
            "type": "FreshAirVentilation",
            "airFlowSetpoint": 300,
            "hasLocation": {"type": "Relationship", "value": room_id}
        }));
    }

    Value::Array(items)
}

pub fn platform_config() -> PlatformConfig {
    PlatformConfig::new("id", vec!["type".to_string()], vec!["airFlowSetpoint".to_string()])
}

pub fn platform_config_json() -> Value {
    json!({
        "ID_KEY": "id",
        "TYPE_KEYS": ["type"],
        "JSONPATH_EXTRA_NODES": ["airFlowSetpoint"]
    })
}

fn class_for(nodetype: &str) -> &'static str {
    match nodetype {
        "Hotel" => "brick:Building",
        "HotelRoom" => "brick:Room",
        "TemperatureSensor" => "brick:Temperature_Sensor",
        "CO2Sensor" => "brick:CO2_Sensor",
        "PresenceSensor" => "brick:Occupancy_Sensor",
        "FreshAirVentilation" => "brick:Fan",
        "airFlowSetpoint_FreshAirVentilation" => "brick:Air_Flow_Setpoint",
        _ => "brick:Equipment",
    }
}

fn property_for(key: &str) -> &'static str {
    match key {
        "hasLocation.value" => "brick:hasLocation",
        "relatedTo.value" => "brick:isPointOf",
        _ => "http://example.com/onto#refersTo",
    }
}

fn access_for(nodetype: &str) -> Option<String> {
    let attribute = match nodetype {
        "CO2Sensor" => "co2",
        "PresenceSensor" => "occupied",
        "airFlowSetpoint_FreshAirVentilation" => "airFlowSetpoint",
        _ => return None,
    };
    Some(format!("{}/{{id}}/attrs/{}", API, attribute))
}

/// What a reviewer does by hand: fix classes, name properties, add data access
pub fn review(draft: &RnrDocument) -> RnrDocument {
    let mut reviewed = draft.clone();
    for record in &mut reviewed.data {
        record.class = class_for(&record.nodetype).to_string();
        record.has_data_access = access_for(&record.nodetype);
        for rel in &mut record.has_relationship {
            rel.property_class = Some(property_for(&rel.raw_data_identifier).to_string());
        }
    }
    reviewed
}

pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// `ontology/Brick.ttl`, returning the directory
    pub fn ontology_dir(&self) -> PathBuf {
        let dir = self.path("ontology");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Brick.ttl"), BRICK_TTL).unwrap();
        dir
    }

    pub fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }
}

/// Every artifact of one pipeline run
pub struct PipelineRun {
    pub entities: PathBuf,
    pub draft: PathBuf,
    pub rnr: PathBuf,
    pub mapping: PathBuf,
    pub kg: PathBuf,
    pub ikg: PathBuf,
    pub controllers: PathBuf,
    pub report: ControllerReport,
}

/// Preprocess -> build RNR -> review -> RML -> KG -> iKG -> controller YAML
pub fn run_pipeline(ws: &Workspace, dump: &Value) -> PipelineRun {
    let input = ws.write_json("platform.json", dump);
    let ontology = ws.ontology_dir();

    let entities = ws.path("preprocessed.json");
    preprocess::preprocess_file(&input, &platform_config(), &entities).unwrap();

    let index = OntologyIndex::build(&[ontology.clone()], None).unwrap();
    let draft = ws.path("rnr_draft.json");
    let draft_doc = RnrBuilder::new(&index).build_file(&entities, &draft, false).unwrap();

    let rnr = ws.path("rnr.json");
    review(&draft_doc).save(&rnr, false).unwrap();

    let mapping = ws.path("mapping.ttl");
    RmlGenerator::new(BASE, "id").generate_file(&rnr, &mapping).unwrap();

    let kg = ws.path("kg.ttl");
    rml::materialize(&mapping, &entities, &kg, EngineKind::Builtin).unwrap();

    let summary = reason::reason(&kg, &[ontology], None).unwrap();

    let controllers = ws.path("controllers.yaml");
    let report = controller::generate_file(&summary.output, &controllers).unwrap();

    PipelineRun {
        entities,
        draft,
        rnr,
        mapping,
        kg,
        ikg: summary.output,
        controllers,
        report,
    }
}

pub fn read_array(path: &Path) -> Vec<Value> {
    let value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    value.as_array().unwrap().clone()
}

/// `<base>/<type>/<id>`
pub fn entity_iri(entity_type: &str, id: &str) -> String {
    format!("{}/{}/{}", BASE, entity_type, id)
}
