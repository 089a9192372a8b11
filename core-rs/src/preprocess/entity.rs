/**
 * entity.rs
 * Normalized platform entity and its preprocessed-JSON form
 */

use serde_json::{Map, Value};

use crate::errors::{KgError, Result};
use crate::jsonpath::scalar_to_string;

pub const ID_FIELD: &str = "id";
pub const TYPE_FIELD: &str = "type";
pub const EXTRA_NODE_FIELD: &str = "extra_node";
pub const PARENT_TYPE_FIELD: &str = "parent_type";
pub const CHILD_TYPE_FIELD: &str = "child_type";
pub const RELATED_TO_FIELD: &str = "relatedTo";

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    /// Present in the platform dump
    Natural,
    /// Promoted from a property of `parent_id`
    Synthesized {
        parent_id: String,
        parent_type: String,
        child_type: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: String,
    pub entity_type: String,
    pub kind: EntityKind,
    /// Every field as written to the preprocessed JSON, including `id` and `type`
    pub payload: Map<String, Value>,
}

impl Entity {
    /// A natural entity; `id` and `type` are (re)written into the payload
    pub fn natural(id: String, entity_type: String, mut payload: Map<String, Value>) -> Self {
        payload.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        payload.insert(TYPE_FIELD.to_string(), Value::String(entity_type.clone()));
        payload.insert(EXTRA_NODE_FIELD.to_string(), Value::Bool(false));
        Self {
            id,
            entity_type,
            kind: EntityKind::Natural,
            payload,
        }
    }

    /// An extra node promoted from `parent`'s `field`
    pub fn synthesized(parent: &Entity, id_key: &str, field: &str, value: Value) -> Self {
        let id = format!("{}_{}", field, parent.id);
        let entity_type = format!("{}_{}", field, parent.entity_type);

        let mut payload = Map::new();
        payload.insert(id_key.to_string(), Value::String(id.clone()));
        payload.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        payload.insert(TYPE_FIELD.to_string(), Value::String(entity_type.clone()));
        payload.insert(field.to_string(), value);
        payload.insert(PARENT_TYPE_FIELD.to_string(), Value::String(parent.entity_type.clone()));
        payload.insert(CHILD_TYPE_FIELD.to_string(), Value::String(field.to_string()));
        let mut related = Map::new();
        related.insert("value".to_string(), Value::String(parent.id.clone()));
        payload.insert(RELATED_TO_FIELD.to_string(), Value::Object(related));
        payload.insert(EXTRA_NODE_FIELD.to_string(), Value::Bool(true));

        Self {
            id,
            entity_type,
            kind: EntityKind::Synthesized {
                parent_id: parent.id.clone(),
                parent_type: parent.entity_type.clone(),
                child_type: field.to_string(),
            },
            payload,
        }
    }

    pub fn is_extra_node(&self) -> bool {
        matches!(self.kind, EntityKind::Synthesized { .. })
    }

    pub fn parent_id(&self) -> Option<&str> {
        match &self.kind {
            EntityKind::Synthesized { parent_id, .. } => Some(parent_id),
            EntityKind::Natural => None,
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.payload.clone())
    }

    /// Read one object of a preprocessed JSON array back
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| KgError::InputShape("preprocessed element is not an object".to_string()))?;

        let field = |name: &str| object.get(name).and_then(scalar_to_string).filter(|s| !s.is_empty());

        let id = field(ID_FIELD)
            .ok_or_else(|| KgError::InputShape("preprocessed object has no 'id'".to_string()))?;
        let entity_type = field(TYPE_FIELD)
            .ok_or_else(|| KgError::InputShape(format!("preprocessed object '{}' has no 'type'", id)))?;

        let extra_node = object
            .get(EXTRA_NODE_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let kind = if extra_node {
            let parent_id = object
                .get(RELATED_TO_FIELD)
                .and_then(|r| r.get("value"))
                .and_then(scalar_to_string)
                .ok_or_else(|| {
                    KgError::InputShape(format!("extra node '{}' has no relatedTo.value", id))
                })?;
            EntityKind::Synthesized {
                parent_id,
                parent_type: field(PARENT_TYPE_FIELD).unwrap_or_default(),
                child_type: field(CHILD_TYPE_FIELD).unwrap_or_default(),
            }
        } else {
            EntityKind::Natural
        };

        Ok(Self {
            id,
            entity_type,
            kind,
            payload: object.clone(),
        })
    }
}
