/**
 * model.rs
 * RNR JSON-LD document: `{"@context": {prefix: ns}, "@data": [record]}`
 */

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::artifact;
use crate::errors::Result;
use crate::ontology::PrefixMap;

/// Prefix of auto-suggested values that still need a human decision
pub const REVIEW_MARKER: &str = "**TODO: PLEASE CHECK**";

pub fn mark_for_review(value: &str) -> String {
    format!("{} {}", REVIEW_MARKER, value)
}

pub fn is_marked(value: &str) -> bool {
    value.contains(REVIEW_MARKER)
}

/// `$[?(@.type=='<type>')]`
pub fn type_iterator(entity_type: &str) -> String {
    format!("$[?(@.type=='{}')]", entity_type)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "relatedNodeType")]
    pub related_node_type: Option<String>,
    #[serde(rename = "propertyClass")]
    pub property_class: Option<String>,
    #[serde(rename = "rawDataIdentifier")]
    pub raw_data_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RnrRecord {
    pub nodetype: String,
    pub iterator: String,
    pub class: String,
    #[serde(rename = "hasRelationship", default)]
    pub has_relationship: Vec<Relationship>,
    #[serde(rename = "hasDataAccess", default)]
    pub has_data_access: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RnrDocument {
    #[serde(rename = "@context", default)]
    pub context: PrefixMap,
    #[serde(rename = "@data", default)]
    pub data: Vec<RnrRecord>,
}

impl RnrDocument {
    pub fn load(path: &Path) -> Result<Self> {
        artifact::read_json(path)
    }

    /// Write the document; an existing file is only replaced with `force`
    pub fn save(&self, path: &Path, force: bool) -> Result<()> {
        artifact::ensure_writable(path, force)?;
        artifact::write_json(path, self)?;
        info!(path = %path.display(), records = self.data.len(), "RNR document written");
        Ok(())
    }

    pub fn record(&self, nodetype: &str) -> Option<&RnrRecord> {
        self.data.iter().find(|r| r.nodetype == nodetype)
    }

    pub fn nodetypes(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(|r| r.nodetype.as_str())
    }
}
