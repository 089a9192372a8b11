/**
 * materialize.rs
 * RML mapping + preprocessed JSON -> knowledge graph Turtle
 */

use oxigraph::model::{NamedNode, Subject, Term, Triple};
use std::fs;
use std::path::Path;
use tracing::info;

use super::engine::engine_for;
use super::parse::parse_mapping;
use crate::config::EngineKind;
use crate::errors::{KgError, Result};
use crate::ontology::PrefixMap;
use crate::rdfio;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeSummary {
    pub engine: &'static str,
    pub triples: usize,
    pub subjects: usize,
}

/// Run `engine` and write the resulting graph to `output`
pub fn materialize(mapping: &Path, input: &Path, output: &Path, engine: EngineKind) -> Result<MaterializeSummary> {
    if !mapping.exists() {
        return Err(KgError::FileNotFound(mapping.display().to_string()));
    }
    let text = fs::read_to_string(mapping)?;
    let prefixes = PrefixMap::extract(&text);
    parse_mapping(&text, &mapping.display().to_string())?.check_unique_subjects()?;

    let engine = engine_for(engine);
    info!(engine = engine.name(), mapping = %mapping.display(), input = %input.display(), "materializing");
    let triples: Vec<Triple> = engine
        .materialize(mapping, input)?
        .into_iter()
        .map(decode_triple)
        .collect();

    let mut subjects: Vec<String> = triples.iter().map(|t| t.subject.to_string()).collect();
    subjects.sort();
    subjects.dedup();

    rdfio::write_turtle(output, &triples, &prefixes, |e| KgError::Materialization(e.to_string()))?;
    info!(path = %output.display(), triples = triples.len(), subjects = subjects.len(), "knowledge graph written");

    Ok(MaterializeSummary {
        engine: engine.name(),
        triples: triples.len(),
        subjects: subjects.len(),
    })
}

/// Undo the percent-encoding of `:` inside entity IRIs
pub fn decode_iri(iri: &str) -> String {
    iri.replace("%3A", ":")
}

fn decode_node(node: NamedNode) -> NamedNode {
    if !node.as_str().contains("%3A") {
        return node;
    }
    let decoded = decode_iri(node.as_str());
    NamedNode::new(decoded).unwrap_or(node)
}

fn decode_triple(triple: Triple) -> Triple {
    let subject = match triple.subject {
        Subject::NamedNode(n) => Subject::NamedNode(decode_node(n)),
        other => other,
    };
    let object = match triple.object {
        Term::NamedNode(n) => Term::NamedNode(decode_node(n)),
        other => other,
    };
    Triple::new(subject, triple.predicate, object)
}
