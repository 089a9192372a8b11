//! Error types for the kgctl pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KgError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input shape error: {0}")]
    InputShape(String),

    #[error("Ontology error: {0}")]
    Ontology(String),

    #[error("RNR validation error: {0}")]
    RnrValidation(String),

    #[error("Materialization error: {0}")]
    Materialization(String),

    #[error("Reasoning error: {0}")]
    Reasoning(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Refusing to overwrite existing artifact: {0} (pass --force to replace it)")]
    Overwrite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl From<regex::Error> for KgError {
    fn from(err: regex::Error) -> Self {
        KgError::Config(err.to_string())
    }
}

impl From<crate::ontology::OntologyError> for KgError {
    fn from(err: crate::ontology::OntologyError) -> Self {
        KgError::Ontology(err.to_string())
    }
}

impl From<crate::jsonpath::JsonPathError> for KgError {
    fn from(err: crate::jsonpath::JsonPathError) -> Self {
        KgError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KgError>;
