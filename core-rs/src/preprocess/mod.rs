/**
 * preprocess module
 * Platform JSON dump -> flat list of typed entities, with extra nodes
 * promoted from configured JSONPath matches
 */

pub mod entity;

use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::artifact;
use crate::config::PlatformConfig;
use crate::errors::{KgError, Result};
use crate::jsonpath::{scalar_to_string, JsonPath};

pub use entity::{Entity, EntityKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub natural: usize,
    pub synthesized: usize,
    pub skipped: usize,
}

/// Normalize a top-level JSON array of platform objects.
///
/// Objects missing the id key or a type key are skipped with a warning, as
/// are repeated ids. Extra nodes follow their parent in the output.
pub fn preprocess(input: &Value, config: &PlatformConfig) -> Result<(Vec<Entity>, PreprocessSummary)> {
    let items = input
        .as_array()
        .ok_or_else(|| KgError::InputShape("platform dump must be a JSON array".to_string()))?;

    let extra_paths = config
        .jsonpath_extra_nodes
        .iter()
        .map(|p| JsonPath::parse(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut entities = Vec::with_capacity(items.len());
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut summary = PreprocessSummary::default();

    for (position, item) in items.iter().enumerate() {
        let entity = match normalize(item, config) {
            Ok(entity) => entity,
            Err(e) => {
                warn!(position, error = %e, "skipping platform object");
                summary.skipped += 1;
                continue;
            }
        };
        if !seen_ids.insert(entity.id.clone()) {
            warn!(position, id = %entity.id, "skipping platform object with duplicate id");
            summary.skipped += 1;
            continue;
        }

        let extras = synthesize_extra_nodes(&entity, item, &extra_paths, config, &mut seen_ids);
        summary.natural += 1;
        summary.synthesized += extras.len();
        entities.push(entity);
        entities.extend(extras);
    }

    info!(
        natural = summary.natural,
        synthesized = summary.synthesized,
        skipped = summary.skipped,
        "platform dump preprocessed"
    );
    Ok((entities, summary))
}

/// Read the dump, preprocess and write the result as a JSON array
pub fn preprocess_file(input: &Path, config: &PlatformConfig, output: &Path) -> Result<PreprocessSummary> {
    if !input.exists() {
        return Err(KgError::FileNotFound(input.display().to_string()));
    }
    let content = fs::read_to_string(input)?;
    let dump: Value = serde_json::from_str(&content)
        .map_err(|e| KgError::InputShape(format!("{} is not valid JSON: {}", input.display(), e)))?;

    let (entities, summary) = preprocess(&dump, config)?;
    write_entities(output, &entities)?;
    Ok(summary)
}

pub fn write_entities(path: &Path, entities: &[Entity]) -> Result<()> {
    let array = Value::Array(entities.iter().map(Entity::to_json).collect());
    artifact::write_json(path, &array)
}

/// Load a preprocessed JSON array; malformed elements are skipped with a warning
pub fn read_entities(path: &Path) -> Result<Vec<Entity>> {
    let value: Value = artifact::read_json(path)?;
    let items = value.as_array().ok_or_else(|| {
        KgError::InputShape(format!("{} is not a preprocessed JSON array", path.display()))
    })?;

    let mut entities = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        match Entity::from_json(item) {
            Ok(entity) => entities.push(entity),
            Err(e) => warn!(position, error = %e, "skipping preprocessed object"),
        }
    }
    Ok(entities)
}

fn normalize(item: &Value, config: &PlatformConfig) -> Result<Entity> {
    let object = item
        .as_object()
        .ok_or_else(|| KgError::InputShape("element is not a JSON object".to_string()))?;

    let id = object
        .get(&config.id_key)
        .and_then(first_scalar)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| KgError::InputShape(format!("missing id key '{}'", config.id_key)))?;

    let mut parts = Vec::with_capacity(config.type_keys.len());
    for key in &config.type_keys {
        let part = object
            .get(key)
            .and_then(first_scalar)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| KgError::InputShape(format!("object '{}' has no value for type key '{}'", id, key)))?;
        parts.push(part);
    }

    Ok(Entity::natural(id, parts.join("_"), object.clone()))
}

/// Scalar as string; a list collapses to its first element
fn first_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.first().and_then(scalar_to_string),
        other => scalar_to_string(other),
    }
}

fn synthesize_extra_nodes(
    parent: &Entity,
    source: &Value,
    paths: &[JsonPath],
    config: &PlatformConfig,
    seen_ids: &mut HashSet<String>,
) -> Vec<Entity> {
    let mut extras = Vec::new();
    for path in paths {
        for found in path.select(source) {
            if found.value.is_null() {
                continue;
            }
            let Some(field) = found.leaf_name() else {
                debug!(path = path.as_str(), "match has no member name, skipping");
                continue;
            };
            let extra = Entity::synthesized(parent, &config.id_key, field, found.value.clone());
            if !seen_ids.insert(extra.id.clone()) {
                warn!(id = %extra.id, parent = %parent.id, "extra node id already used, skipping");
                continue;
            }
            extras.push(extra);
        }
    }
    extras
}
