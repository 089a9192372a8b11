//! RDF file reading and Turtle writing shared by the RDF stages

use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{NamedNode, Triple};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::artifact;
use crate::errors::Result;
use crate::ontology::PrefixMap;

#[derive(Error, Debug)]
pub enum RdfIoError {
    #[error("Unsupported RDF format for {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Failed to serialize RDF: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// RDF format from the file extension
pub fn format_for_path(path: &Path) -> Option<RdfFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "ttl" | "turtle" => Some(RdfFormat::Turtle),
        "owl" | "rdf" | "xml" => Some(RdfFormat::RdfXml),
        "n3" => Some(RdfFormat::N3),
        "nt" => Some(RdfFormat::NTriples),
        "nq" => Some(RdfFormat::NQuads),
        "trig" => Some(RdfFormat::TriG),
        other => RdfFormat::from_extension(other),
    }
}

/// Parse RDF text; quads from named graphs are folded into the default graph
pub fn parse_triples(text: &str, format: RdfFormat, origin: &str) -> std::result::Result<Vec<Triple>, RdfIoError> {
    let mut triples = Vec::new();
    for quad in RdfParser::from_format(format).for_reader(text.as_bytes()) {
        let quad = quad.map_err(|e| RdfIoError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        triples.push(Triple::new(quad.subject, quad.predicate, quad.object));
    }
    Ok(triples)
}

/// Read an RDF file (format by extension) with the prefixes it declares
pub fn read_document(path: &Path) -> std::result::Result<(Vec<Triple>, PrefixMap), RdfIoError> {
    let format = format_for_path(path)
        .ok_or_else(|| RdfIoError::UnsupportedFormat(path.display().to_string()))?;
    let text = fs::read_to_string(path)?;
    let triples = parse_triples(&text, format, &path.display().to_string())?;
    let prefixes = PrefixMap::extract(&text);
    debug!(path = %path.display(), triples = triples.len(), prefixes = prefixes.len(), "RDF document read");
    Ok((triples, prefixes))
}

/// Serialize triples as Turtle, sorted so identical graphs give identical bytes
pub fn serialize_turtle<'a, I>(triples: I, prefixes: &PrefixMap) -> std::result::Result<Vec<u8>, RdfIoError>
where
    I: IntoIterator<Item = &'a Triple>,
{
    let mut sorted: Vec<(String, &Triple)> = triples.into_iter().map(|t| (t.to_string(), t)).collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted.dedup_by(|a, b| a.0 == b.0);

    let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle);
    for (prefix, namespace) in prefixes.iter() {
        if let Err(e) = NamedNode::new(namespace) {
            warn!(prefix, namespace, error = %e, "skipping invalid prefix binding");
            continue;
        }
        serializer = serializer
            .with_prefix(prefix, namespace)
            .map_err(|e| RdfIoError::Serialize(e.to_string()))?;
    }

    let mut writer = serializer.for_writer(Vec::new());
    for (_, triple) in sorted {
        writer
            .serialize_triple(triple.as_ref())
            .map_err(|e| RdfIoError::Serialize(e.to_string()))?;
    }
    writer.finish().map_err(|e| RdfIoError::Serialize(e.to_string()))
}

/// Serialize and write atomically; the caller maps serialization failures to its stage error
pub fn write_turtle<'a, I, F>(path: &Path, triples: I, prefixes: &PrefixMap, on_error: F) -> Result<()>
where
    I: IntoIterator<Item = &'a Triple>,
    F: FnOnce(RdfIoError) -> crate::errors::KgError,
{
    let bytes = serialize_turtle(triples, prefixes).map_err(on_error)?;
    artifact::write_atomic(path, &bytes)
}
