/**
 * controller module
 *
 * Inferred KG -> ventilation controller configuration (YAML).
 *
 * Per room: the first ventilation device supplies the actuation access; the
 * mode is `co2` when a CO2 sensor is present, else `presence` when a presence
 * sensor is, else `timetable`. Rooms without a device are skipped.
 */

pub mod queries;

use oxigraph::io::RdfFormat;
use oxigraph::store::Store;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::artifact;
use crate::errors::{KgError, Result};
use crate::ontology::{QueryRow, SparqlQuery};
use crate::rdfio;

pub const VENTILATION_FUNCTION: &str = "Ventilation";
pub const DEBUG_SUFFIX: &str = "_debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerMode {
    Co2,
    Presence,
    Timetable,
}

impl fmt::Display for ControllerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControllerMode::Co2 => "co2",
            ControllerMode::Presence => "presence",
            ControllerMode::Timetable => "timetable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerInputs {
    pub sensor_access: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerOutputs {
    pub actuation_access: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerEntry {
    pub room: String,
    pub controller_function: String,
    pub controller_mode: ControllerMode,
    pub inputs: ControllerInputs,
    pub outputs: ControllerOutputs,
}

/// Query results grouped by room, written next to the YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomDebug {
    pub devices: Vec<QueryRow>,
    pub co2_sensors: Vec<QueryRow>,
    pub presence_sensors: Vec<QueryRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerReport {
    pub entries: Vec<ControllerEntry>,
    pub rooms: BTreeMap<String, RoomDebug>,
}

impl ControllerReport {
    pub fn skipped_rooms(&self) -> usize {
        self.rooms.len() - self.entries.len()
    }
}

/// Load an RDF file into a fresh in-memory store
pub fn load_graph(path: &Path) -> Result<Store> {
    if !path.exists() {
        return Err(KgError::FileNotFound(path.display().to_string()));
    }
    let format = rdfio::format_for_path(path).unwrap_or(RdfFormat::Turtle);
    let text = fs::read_to_string(path)?;
    let store = Store::new().map_err(|e| KgError::Query(e.to_string()))?;
    store
        .load_from_reader(format, text.as_bytes())
        .map_err(|e| KgError::Query(format!("{}: {}", path.display(), e)))?;
    Ok(store)
}

fn run(query: SparqlQuery, store: &Store, key_columns: &[&str]) -> Result<Vec<QueryRow>> {
    let mut rows = query.select(store).map_err(|e| KgError::Query(e.to_string()))?;
    // unbound columns sort first
    rows.sort_by_cached_key(|row| {
        key_columns
            .iter()
            .map(|c| row.get(*c).cloned().unwrap_or_default())
            .collect::<Vec<_>>()
    });
    Ok(rows)
}

fn group_by_room(rows: Vec<QueryRow>, rooms: &mut BTreeMap<String, RoomDebug>, pick: fn(&mut RoomDebug) -> &mut Vec<QueryRow>) {
    for row in rows {
        let Some(room) = row.get("room").cloned() else { continue };
        if let Some(debug) = rooms.get_mut(&room) {
            pick(debug).push(row);
        }
    }
}

/// Run the four queries and derive one entry per equipped room
pub fn generate(store: &Store) -> Result<ControllerReport> {
    let mut rooms: BTreeMap<String, RoomDebug> = BTreeMap::new();
    for row in run(queries::rooms(), store, &["room"])? {
        if let Some(room) = row.get("room") {
            rooms.entry(room.clone()).or_default();
        }
    }

    let devices = run(
        queries::ventilation_devices(),
        store,
        &["room", "device", "point", "actuation_access"],
    )?;
    let co2 = run(queries::co2_sensors(), store, &["room", "sensor", "sensor_access"])?;
    let presence = run(queries::presence_sensors(), store, &["room", "sensor", "sensor_access"])?;
    debug!(
        rooms = rooms.len(),
        devices = devices.len(),
        co2 = co2.len(),
        presence = presence.len(),
        "controller queries finished"
    );

    group_by_room(devices, &mut rooms, |d| &mut d.devices);
    group_by_room(co2, &mut rooms, |d| &mut d.co2_sensors);
    group_by_room(presence, &mut rooms, |d| &mut d.presence_sensors);

    let mut entries = Vec::new();
    for (room, found) in &rooms {
        match entry_for(room, found) {
            Some(entry) => entries.push(entry),
            None => debug!(room = %room, "room has no ventilation device, skipped"),
        }
    }

    Ok(ControllerReport { entries, rooms })
}

fn entry_for(room: &str, found: &RoomDebug) -> Option<ControllerEntry> {
    let device = found.devices.first()?;
    let actuation_access = device.get("actuation_access").cloned();

    let (controller_mode, sensor_access) = if let Some(sensor) = found.co2_sensors.first() {
        (ControllerMode::Co2, sensor.get("sensor_access").cloned())
    } else if let Some(sensor) = found.presence_sensors.first() {
        (ControllerMode::Presence, sensor.get("sensor_access").cloned())
    } else {
        (ControllerMode::Timetable, None)
    };

    Some(ControllerEntry {
        room: room.to_string(),
        controller_function: VENTILATION_FUNCTION.to_string(),
        controller_mode,
        inputs: ControllerInputs { sensor_access },
        outputs: ControllerOutputs { actuation_access },
    })
}

/// `<output-stem>_debug.json` beside the YAML
pub fn debug_path(output: &Path) -> PathBuf {
    artifact::sibling_with_suffix(output, DEBUG_SUFFIX, "json")
}

/// Generate from the graph file and write the YAML plus its debug dump
pub fn generate_file(graph: &Path, output: &Path) -> Result<ControllerReport> {
    let store = load_graph(graph)?;
    let report = generate(&store)?;

    let yaml = serde_yaml::to_string(&report.entries)?;
    artifact::write_atomic(output, yaml.as_bytes())?;
    artifact::write_json(&debug_path(output), &report.rooms)?;

    info!(
        path = %output.display(),
        entries = report.entries.len(),
        skipped = report.skipped_rooms(),
        "controller configuration written"
    );
    Ok(report)
}
