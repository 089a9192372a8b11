/**
 * platform.rs
 * Parser for platform flavor files (JSON format)
 *
 * Format:
 * ```json
 * {
 *   "ID_KEY": "id",
 *   "TYPE_KEYS": ["type"],
 *   "JSONPATH_EXTRA_NODES": ["$.airFlowSetpoint"]
 * }
 * ```
 */

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{KgError, Result};
use crate::jsonpath;

/// Identifies how entities of one platform flavor (FIWARE, openHAB, ...) are keyed and typed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformConfig {
    #[serde(rename = "ID_KEY")]
    pub id_key: String,
    #[serde(rename = "TYPE_KEYS")]
    pub type_keys: Vec<String>,
    #[serde(rename = "JSONPATH_EXTRA_NODES", default)]
    pub jsonpath_extra_nodes: Vec<String>,
}

impl PlatformConfig {
    pub fn new(id_key: impl Into<String>, type_keys: Vec<String>, jsonpath_extra_nodes: Vec<String>) -> Self {
        Self {
            id_key: id_key.into(),
            type_keys,
            jsonpath_extra_nodes,
        }
    }

    /// Load a platform config file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(KgError::FileNotFound(path.to_string_lossy().to_string()));
        }

        let content = fs::read_to_string(path)?;
        let config: PlatformConfig = serde_json::from_str(&content).map_err(|e| {
            KgError::Config(format!("Invalid platform config {}: {}", path.display(), e))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Ensures:
    /// - ID_KEY is non-empty
    /// - TYPE_KEYS has at least one non-empty key
    /// - every extra-node path stays within the restricted JSONPath subset
    pub fn validate(&self) -> Result<()> {
        if self.id_key.trim().is_empty() {
            return Err(KgError::Config("ID_KEY cannot be empty".to_string()));
        }

        if self.type_keys.is_empty() {
            return Err(KgError::Config("TYPE_KEYS must name at least one key".to_string()));
        }

        if let Some(blank) = self.type_keys.iter().position(|k| k.trim().is_empty()) {
            return Err(KgError::Config(format!("TYPE_KEYS[{}] is empty", blank)));
        }

        for path in &self.jsonpath_extra_nodes {
            jsonpath::ensure_restricted(path)?;
        }

        Ok(())
    }
}
