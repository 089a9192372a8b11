//! Integration tests for the kgctl binary
//!
//! Runs the compiled binary stage by stage, the way an operator would, and
//! checks exit status, status lines and the artifacts left on disk.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use kgctl_core::controller::{ControllerEntry, ControllerMode};
use kgctl_core::rnr::RnrDocument;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn kgctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kgctl"))
        .args(args)
        .env_remove("KGCTL_INDEX_CACHE")
        .output()
        .expect("Failed to run kgctl")
}

fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "kgctl failed\nSTDOUT:\n{}\nSTDERR:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_cli_version_output() {
    let output = kgctl(&["--version"]);
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("kgctl") && out.contains(kgctl_core::VERSION));
}

#[test]
fn test_cli_full_pipeline() {
    let ws = Workspace::new();
    let input = ws.write_json("platform.json", &hotel_dump(&[RoomSensor::Co2]));
    let platform = ws.write_json("platform_config.json", &platform_config_json());
    let ontology = ws.ontology_dir();
    let entities = ws.path("preprocessed.json");
    let draft = ws.path("rnr_draft.json");
    let rnr = ws.path("rnr.json");
    let mapping = ws.path("mapping.ttl");
    let kg = ws.path("kg.ttl");
    let controllers = ws.path("controllers.yaml");

    let output = kgctl(&[
        "preprocess", "--input", s(&input), "--platform", s(&platform), "--output", s(&entities),
    ]);
    assert_success(&output);
    assert!(stdout(&output).contains("Extra nodes: 2"));

    let output = kgctl(&[
        "build-rnr", "--input", s(&entities), "--ontology", s(&ontology), "--output", s(&draft),
    ]);
    assert_success(&output);
    assert!(stdout(&output).contains("Node types: 6"));

    // the unreviewed draft is refused
    let output = kgctl(&["check-rnr", "--rnr", s(&draft)]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("HotelRoom"));
    let output = kgctl(&["generate-rml", "--rnr", s(&draft), "--output", s(&mapping)]);
    assert!(!output.status.success());
    assert!(!mapping.exists());

    review(&RnrDocument::load(&draft).unwrap()).save(&rnr, false).unwrap();
    assert_success(&kgctl(&["check-rnr", "--rnr", s(&rnr)]));

    assert_success(&kgctl(&["generate-rml", "--rnr", s(&rnr), "--output", s(&mapping)]));
    assert!(fs::read_to_string(&mapping).unwrap().contains("rr:parentTriplesMap"));

    let output = kgctl(&[
        "materialize", "--mapping", s(&mapping), "--input", s(&entities), "--output", s(&kg),
        "--engine", "builtin",
    ]);
    assert_success(&output);
    assert!(stdout(&output).contains("Subjects: 11"));

    let output = kgctl(&["reason", "--graph", s(&kg), "--ontology", s(&ontology)]);
    assert_success(&output);
    let ikg = ws.path("kg_inferred.ttl");
    assert!(ikg.exists());

    let output = kgctl(&["controller-config", "--graph", s(&ikg), "--output", s(&controllers)]);
    assert_success(&output);
    assert!(ws.path("controllers_debug.json").exists());

    let entries: Vec<ControllerEntry> =
        serde_yaml::from_str(&fs::read_to_string(&controllers).unwrap()).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.controller_mode == ControllerMode::Co2));
}

#[test]
fn test_cli_overwrite_refused() {
    let ws = Workspace::new();
    let input = ws.write_json("platform.json", &hotel_dump(&[]));
    let platform = ws.write_json("platform_config.json", &platform_config_json());
    let ontology = ws.ontology_dir();
    let entities = ws.path("preprocessed.json");
    let rnr = ws.path("rnr.json");

    assert_success(&kgctl(&[
        "preprocess", "--input", s(&input), "--platform", s(&platform), "--output", s(&entities),
    ]));
    fs::write(&rnr, "{}").unwrap();

    let output = kgctl(&[
        "build-rnr", "--input", s(&entities), "--ontology", s(&ontology), "--output", s(&rnr),
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--force"));
    assert_eq!(fs::read_to_string(&rnr).unwrap(), "{}");
    // refused before the ontology is indexed
    assert!(!ontology.join("Brick_index.json").exists());

    assert_success(&kgctl(&[
        "build-rnr", "--input", s(&entities), "--ontology", s(&ontology), "--output", s(&rnr), "--force",
    ]));
    assert!(!RnrDocument::load(&rnr).unwrap().data.is_empty());
    assert!(ontology.join("Brick_index.json").exists());
}

#[test]
fn test_cli_pipeline_config_supplies_defaults() {
    let ws = Workspace::new();
    ws.ontology_dir();
    let config = ws.path("kgctl.yaml");
    fs::write(
        &config,
        "baseIri: http://hotel.example.org\nontologies:\n  - ontology\nindexCache: cache\n",
    )
    .unwrap();

    let output = kgctl(&["--config", s(&config), "index-ontology"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Classes:"));
    assert!(ws.path("cache").join("Brick_index.json").exists());

    let output = kgctl(&["suggest-class", "Room", "--config", s(&config)]);
    assert_success(&output);
    assert!(stdout(&output).contains("brick:Room"));

    // base IRI from the config file, id key from the command line
    let entities = ws.write_json(
        "preprocessed.json",
        &serde_json::json!([{"uid": "r1", "id": "r1", "type": "HotelRoom", "extra_node": false}]),
    );
    let draft = ws.path("rnr_draft.json");
    assert_success(&kgctl(&[
        "--config", s(&config), "build-rnr", "--input", s(&entities), "--output", s(&draft),
    ]));
    let rnr = ws.path("rnr.json");
    review(&RnrDocument::load(&draft).unwrap()).save(&rnr, false).unwrap();

    let mapping = ws.path("mapping.ttl");
    assert_success(&kgctl(&[
        "--config", s(&config), "generate-rml", "--rnr", s(&rnr), "--output", s(&mapping), "--id-key", "uid",
    ]));
    let text = fs::read_to_string(&mapping).unwrap();
    assert!(text.contains("http://hotel.example.org/HotelRoom/{uid}"));
}

#[test]
fn test_cli_requires_an_ontology() {
    let ws = Workspace::new();
    let output = kgctl(&["suggest-class", "Room"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("no ontology given"));

    let output = kgctl(&["index-ontology", "--ontology", s(&ws.path("missing.ttl"))]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_suggest_property() {
    let ws = Workspace::new();
    let ontology = ws.ontology_dir();
    let output = kgctl(&["suggest-class", "hasLocation.value", "--property", "--ontology", s(&ontology)]);
    assert_success(&output);
    assert!(stdout(&output).contains("brick:hasLocation"));
}

#[test]
fn test_cli_rejects_unknown_engine() {
    let ws = Workspace::new();
    let output = kgctl(&[
        "materialize",
        "--mapping", s(&ws.path("mapping.ttl")),
        "--input", s(&ws.path("preprocessed.json")),
        "--output", s(&ws.path("kg.ttl")),
        "--engine", "rmlmapper",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("rmlmapper"));
}
