/**
 * pipeline.rs
 * Optional pipeline defaults (YAML format)
 *
 * Format:
 * ```yaml
 * baseIri: http://example.com
 * idKey: id
 * engine: builtin
 * ontologies:
 *   - ontologies/Brick.ttl
 * indexCache: .kgctl/index
 * strictIds: false
 * ```
 *
 * CLI flags always win over values from this file.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{KgError, Result};

/// Environment variable naming a directory for ontology index sidecars
pub const INDEX_CACHE_ENV: &str = "KGCTL_INDEX_CACHE";

pub const DEFAULT_BASE_IRI: &str = "http://example.com";

/// RML engines the materializer knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    Builtin,
    MorphKgc,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Builtin => "builtin",
            EngineKind::MorphKgc => "morph-kgc",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = KgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "builtin" => Ok(EngineKind::Builtin),
            "morph-kgc" | "morph_kgc" | "morphkgc" => Ok(EngineKind::MorphKgc),
            other => Err(KgError::Config(format!(
                "Unknown RML engine '{}' (expected one of: builtin, morph-kgc)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    #[serde(default = "default_base_iri")]
    pub base_iri: String,
    #[serde(default = "default_id_key")]
    pub id_key: String,
    #[serde(default = "default_engine")]
    pub engine: EngineKind,
    #[serde(default)]
    pub ontologies: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_cache: Option<PathBuf>,
    #[serde(default)]
    pub strict_ids: bool,
}

fn default_base_iri() -> String {
    DEFAULT_BASE_IRI.to_string()
}

fn default_id_key() -> String {
    "id".to_string()
}

fn default_engine() -> EngineKind {
    EngineKind::Builtin
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_iri: default_base_iri(),
            id_key: default_id_key(),
            engine: default_engine(),
            ontologies: Vec::new(),
            index_cache: None,
            strict_ids: false,
        }
    }
}

impl PipelineConfig {
    /// Load kgctl.yaml; relative ontology and cache paths resolve against the file's directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(KgError::FileNotFound(path.to_string_lossy().to_string()));
        }

        let content = fs::read_to_string(path)?;
        let mut config: PipelineConfig = serde_yaml::from_str(&content)
            .map_err(|e| KgError::Config(format!("Invalid pipeline config {}: {}", path.display(), e)))?;

        if let Some(dir) = path.parent() {
            config.ontologies = config
                .ontologies
                .into_iter()
                .map(|p| if p.is_relative() { dir.join(p) } else { p })
                .collect();
            config.index_cache = config
                .index_cache
                .map(|p| if p.is_relative() { dir.join(p) } else { p });
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from an optional path, falling back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let base = self.base_iri.trim();
        if base.is_empty() {
            return Err(KgError::Config("baseIri cannot be empty".to_string()));
        }
        if !base.contains("://") {
            return Err(KgError::Config(format!("baseIri must be absolute: {}", base)));
        }
        if self.id_key.trim().is_empty() {
            return Err(KgError::Config("idKey cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Index cache directory: config value first, then `KGCTL_INDEX_CACHE`
    pub fn index_cache_dir(&self) -> Option<PathBuf> {
        self.index_cache.clone().or_else(|| {
            std::env::var_os(INDEX_CACHE_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
    }
}
