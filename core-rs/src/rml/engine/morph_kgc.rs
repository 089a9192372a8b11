/**
 * morph_kgc.rs
 * External engine: `python3 -m morph_kgc <config.ini>`
 *
 * The engine writes an INI configuration into a scratch directory, runs
 * morph-kgc and reads back the N-Triples it produced.
 */

use oxigraph::io::RdfFormat;
use oxigraph::model::Triple;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

use super::RmlEngine;
use crate::errors::{KgError, Result};
use crate::rdfio;

const OUTPUT_FILE: &str = "knowledge-graph.nt";
const CONFIG_FILE: &str = "config.ini";

pub struct MorphKgcEngine {
    python: String,
}

impl Default for MorphKgcEngine {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl MorphKgcEngine {
    pub fn new(python: impl Into<String>) -> Self {
        Self { python: python.into() }
    }

    /// INI configuration pointing the single data source at `data`
    pub fn config(mapping: &Path, data: &Path, output: &Path) -> String {
        format!(
            "[CONFIGURATION]\n\
             output_file = {}\n\
             output_format = N-TRIPLES\n\
             \n\
             [DataSource1]\n\
             mappings = {}\n\
             file_path = {}\n",
            output.display(),
            mapping.display(),
            data.display()
        )
    }

    /// Private to one run; removed when dropped
    fn scratch_dir() -> Result<TempDir> {
        Ok(tempfile::Builder::new().prefix("kgctl-morph-kgc-").tempdir()?)
    }

    fn run(&self, workdir: &Path, mapping: &Path, data: &Path) -> Result<Vec<Triple>> {
        let output_path = workdir.join(OUTPUT_FILE);
        let config_path = workdir.join(CONFIG_FILE);
        fs::write(&config_path, Self::config(&absolute(mapping)?, &absolute(data)?, &output_path))?;
        debug!(config = %config_path.display(), "morph-kgc configuration written");

        let output = Command::new(&self.python)
            .args(["-m", "morph_kgc"])
            .arg(&config_path)
            .current_dir(workdir)
            .output()
            .map_err(|e| KgError::Materialization(format!("Failed to run {} -m morph_kgc: {}", self.python, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KgError::Materialization(format!(
                "morph_kgc exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        if !output_path.exists() {
            return Err(KgError::Materialization(format!(
                "morph_kgc produced no output at {}",
                output_path.display()
            )));
        }
        let text = fs::read_to_string(&output_path)?;
        rdfio::parse_triples(&text, RdfFormat::NTriples, &output_path.display().to_string())
            .map_err(|e| KgError::Materialization(e.to_string()))
    }
}

impl RmlEngine for MorphKgcEngine {
    fn name(&self) -> &'static str {
        "morph-kgc"
    }

    fn materialize(&self, mapping: &Path, data: &Path) -> Result<Vec<Triple>> {
        for path in [mapping, data] {
            if !path.exists() {
                return Err(KgError::FileNotFound(path.display().to_string()));
            }
        }

        let workdir = Self::scratch_dir()?;
        debug!(dir = %workdir.path().display(), "morph-kgc scratch directory");
        let triples = self.run(workdir.path(), mapping, data)?;
        info!(triples = triples.len(), "morph-kgc finished");
        Ok(triples)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
