/**
 * builder.rs
 * Preprocessed entities + ontology index -> RNR document
 */

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::model::{mark_for_review, type_iterator, Relationship, RnrDocument, RnrRecord};
use crate::artifact;
use crate::errors::Result;
use crate::jsonpath::scalar_to_string;
use crate::ontology::OntologyIndex;
use crate::preprocess::entity::{CHILD_TYPE_FIELD, EXTRA_NODE_FIELD, PARENT_TYPE_FIELD, TYPE_FIELD};
use crate::preprocess::{read_entities, Entity};

/// Fields written by preprocessing that never hold references
const BOOKKEEPING_FIELDS: [&str; 4] = [TYPE_FIELD, EXTRA_NODE_FIELD, PARENT_TYPE_FIELD, CHILD_TYPE_FIELD];

/// A reference from one entity type to another found in the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedRelationship {
    pub related_type: String,
    /// Dotted member path with list indices collapsed (`refs`, `hasLocation.value`)
    pub path: String,
}

pub struct RnrBuilder<'a> {
    index: &'a OntologyIndex,
    strict_ids: bool,
}

impl<'a> RnrBuilder<'a> {
    pub fn new(index: &'a OntologyIndex) -> Self {
        Self {
            index,
            strict_ids: false,
        }
    }

    /// Only JSON strings may match ids (numbers and booleans never do)
    pub fn strict_ids(mut self, strict: bool) -> Self {
        self.strict_ids = strict;
        self
    }

    pub fn build(&self, entities: &[Entity]) -> Result<RnrDocument> {
        let id_types = id_type_map(entities);

        let mut data = Vec::new();
        for entity in first_of_each_type(entities) {
            let relationships = detect_relationships(entity, &id_types, self.strict_ids);
            let suggestion = self.index.suggest_class(&entity.entity_type, self.index.prefixes())?;
            debug!(
                nodetype = %entity.entity_type,
                suggestion = %suggestion,
                relationships = relationships.len(),
                "RNR record"
            );

            data.push(RnrRecord {
                nodetype: entity.entity_type.clone(),
                iterator: type_iterator(&entity.entity_type),
                class: mark_for_review(&suggestion.to_string()),
                has_relationship: relationships
                    .into_iter()
                    .map(|r| Relationship {
                        related_node_type: Some(r.related_type),
                        property_class: None,
                        raw_data_identifier: r.path,
                    })
                    .collect(),
                has_data_access: None,
            });
        }

        info!(records = data.len(), entities = entities.len(), "RNR document built");
        Ok(RnrDocument {
            context: self.index.prefixes().clone(),
            data,
        })
    }

    /// Read preprocessed JSON, build and save. The overwrite guard runs
    /// before any work is done.
    pub fn build_file(&self, input: &Path, output: &Path, force: bool) -> Result<RnrDocument> {
        artifact::ensure_writable(output, force)?;
        let entities = read_entities(input)?;
        let doc = self.build(&entities)?;
        doc.save(output, force)?;
        Ok(doc)
    }
}

/// id -> type over every entity; the first entity wins on repeated ids
fn id_type_map(entities: &[Entity]) -> HashMap<&str, &str> {
    let mut map = HashMap::new();
    for entity in entities {
        map.entry(entity.id.as_str()).or_insert(entity.entity_type.as_str());
    }
    map
}

/// First entity of every type, in input order
pub fn first_of_each_type(entities: &[Entity]) -> Vec<&Entity> {
    let mut seen = std::collections::HashSet::new();
    entities
        .iter()
        .filter(|e| seen.insert(e.entity_type.as_str()))
        .collect()
}

/// Walk the payload for scalars equal to another entity's id, one result per related type
pub fn detect_relationships(
    entity: &Entity,
    id_types: &HashMap<&str, &str>,
    strict_ids: bool,
) -> Vec<DetectedRelationship> {
    let mut found: Vec<DetectedRelationship> = Vec::new();
    let mut path = Vec::new();
    for (key, value) in &entity.payload {
        if BOOKKEEPING_FIELDS.contains(&key.as_str()) {
            continue;
        }
        path.push(key.as_str());
        walk(value, &mut path, entity, id_types, strict_ids, &mut found);
        path.pop();
    }
    found
}

fn walk<'v>(
    value: &'v Value,
    path: &mut Vec<&'v str>,
    entity: &Entity,
    id_types: &HashMap<&str, &str>,
    strict_ids: bool,
    found: &mut Vec<DetectedRelationship>,
) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                path.push(key.as_str());
                walk(child, path, entity, id_types, strict_ids, found);
                path.pop();
            }
        }
        // list indices collapse onto the container's path
        Value::Array(items) => {
            for item in items {
                walk(item, path, entity, id_types, strict_ids, found);
            }
        }
        Value::Null => {}
        scalar => {
            if strict_ids && !scalar.is_string() {
                return;
            }
            let Some(text) = scalar_to_string(scalar) else { return };
            if text == entity.id {
                return;
            }
            if let Some(related_type) = id_types.get(text.as_str()) {
                if found.iter().all(|r| r.related_type != *related_type) {
                    found.push(DetectedRelationship {
                        related_type: related_type.to_string(),
                        path: path.join("."),
                    });
                }
            }
        }
    }
}
