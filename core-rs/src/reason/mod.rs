/**
 * reason module
 *
 * KG + ontology -> inferred KG. The closure runs over the union of both
 * graphs; only triples touching a node of the input KG are kept.
 */

pub mod rules;

use oxigraph::model::{Term, Triple};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::artifact;
use crate::errors::{KgError, Result};
use crate::ontology::index::expand_sources;
use crate::ontology::PrefixMap;
use crate::rdfio;

pub use rules::{closure, ClosureStats, Rule};

pub const INFERRED_SUFFIX: &str = "_inferred";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonSummary {
    pub output: PathBuf,
    pub input_triples: usize,
    pub ontology_triples: usize,
    pub closure_triples: usize,
    pub output_triples: usize,
    pub rounds: usize,
}

/// `<kg-stem>_inferred.ttl` beside the KG
pub fn default_output(graph: &Path) -> PathBuf {
    artifact::sibling_with_suffix(graph, INFERRED_SUFFIX, "ttl")
}

/// Every subject and object of `graph`
pub fn node_snapshot(graph: &[Triple]) -> HashSet<Term> {
    let mut nodes = HashSet::with_capacity(graph.len() * 2);
    for triple in graph {
        nodes.insert(Term::from(triple.subject.clone()));
        nodes.insert(triple.object.clone());
    }
    nodes
}

/// Closure of `graph` ∪ `ontology`, restricted to triples touching a node of `graph`.
/// The result is sorted.
pub fn infer(graph: &[Triple], ontology: &[Triple]) -> (Vec<Triple>, ClosureStats, usize) {
    let snapshot = node_snapshot(graph);

    let mut working: HashSet<Triple> = HashSet::with_capacity(graph.len() + ontology.len());
    working.extend(graph.iter().cloned());
    working.extend(ontology.iter().cloned());
    let (closed, stats) = closure(working);
    let closure_size = closed.len();

    let mut kept: Vec<Triple> = closed
        .into_iter()
        .filter(|t| snapshot.contains(&Term::from(t.subject.clone())) || snapshot.contains(&t.object))
        .collect();
    kept.sort_by_cached_key(|t| t.to_string());
    (kept, stats, closure_size)
}

/// Read the KG and ontologies, infer, write `output` (default `<kg-stem>_inferred.ttl`)
pub fn reason(graph_path: &Path, ontologies: &[PathBuf], output: Option<&Path>) -> Result<ReasonSummary> {
    if !graph_path.exists() {
        return Err(KgError::FileNotFound(graph_path.display().to_string()));
    }
    let to_reasoning = |e: rdfio::RdfIoError| KgError::Reasoning(e.to_string());

    let (graph, mut prefixes) = rdfio::read_document(graph_path).map_err(to_reasoning)?;

    let mut ontology = Vec::new();
    let mut ontology_prefixes = PrefixMap::new();
    for file in expand_sources(ontologies)? {
        let (triples, file_prefixes) = rdfio::read_document(&file).map_err(to_reasoning)?;
        ontology.extend(triples);
        ontology_prefixes.merge(&file_prefixes);
    }
    prefixes.merge(&ontology_prefixes);

    let (inferred, stats, closure_triples) = infer(&graph, &ontology);

    let output = output.map(Path::to_path_buf).unwrap_or_else(|| default_output(graph_path));
    rdfio::write_turtle(&output, &inferred, &prefixes, to_reasoning)?;

    let summary = ReasonSummary {
        output,
        input_triples: graph.len(),
        ontology_triples: ontology.len(),
        closure_triples,
        output_triples: inferred.len(),
        rounds: stats.rounds,
    };
    info!(
        path = %summary.output.display(),
        input = summary.input_triples,
        ontology = summary.ontology_triples,
        closure = summary.closure_triples,
        output = summary.output_triples,
        rounds = summary.rounds,
        "inferred knowledge graph written"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::io::RdfFormat;
    use std::fs;
    use tempfile::TempDir;

    const ONTOLOGY: &str = r#"
@prefix brick: <https://brickschema.org/schema/Brick#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .

brick:Fan rdfs:subClassOf brick:HVAC_Equipment .
brick:HVAC_Equipment rdfs:subClassOf brick:Equipment .
brick:Boiler rdfs:subClassOf brick:Equipment .
brick:hasLocation owl:inverseOf brick:isLocationOf .
"#;

    const KG: &str = r#"
@prefix brick: <https://brickschema.org/schema/Brick#> .
@prefix ex: <http://example.com/> .

ex:f1 a brick:Fan ; brick:hasLocation ex:r1 .
ex:r1 a brick:Room .
"#;

    fn parse(text: &str) -> Vec<Triple> {
        rdfio::parse_triples(text, RdfFormat::Turtle, "test").unwrap()
    }

    #[test]
    fn test_infer_keeps_node_local_triples() {
        let (inferred, _, closure_size) = infer(&parse(KG), &parse(ONTOLOGY));
        let text: Vec<String> = inferred.iter().map(|t| t.to_string()).collect();

        assert!(text.contains(
            &"<http://example.com/f1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <https://brickschema.org/schema/Brick#Equipment>"
                .to_string()
        ));
        assert!(text.contains(
            &"<http://example.com/r1> <https://brickschema.org/schema/Brick#isLocationOf> <http://example.com/f1>"
                .to_string()
        ));
        // Boiler never touches the KG
        assert!(!text.iter().any(|t| t.contains("Boiler")));
        assert!(closure_size > inferred.len());
    }

    #[test]
    fn test_every_triple_touches_snapshot() {
        let graph = parse(KG);
        let snapshot = node_snapshot(&graph);
        let (inferred, _, _) = infer(&graph, &parse(ONTOLOGY));
        for t in &inferred {
            assert!(snapshot.contains(&Term::from(t.subject.clone())) || snapshot.contains(&t.object));
        }
    }

    #[test]
    fn test_reason_writes_default_output_and_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let kg = temp_dir.path().join("kg.ttl");
        let ontology = temp_dir.path().join("Brick.ttl");
        fs::write(&kg, KG).unwrap();
        fs::write(&ontology, ONTOLOGY).unwrap();

        let first = reason(&kg, &[ontology.clone()], None).unwrap();
        assert_eq!(first.output, temp_dir.path().join("kg_inferred.ttl"));
        let first_bytes = fs::read(&first.output).unwrap();
        assert!(String::from_utf8_lossy(&first_bytes).contains("@prefix brick:"));

        let second_path = temp_dir.path().join("again.ttl");
        reason(&kg, &[ontology], Some(&second_path)).unwrap();
        assert_eq!(first_bytes, fs::read(&second_path).unwrap());
    }

    #[test]
    fn test_missing_graph() {
        let temp_dir = TempDir::new().unwrap();
        let err = reason(&temp_dir.path().join("none.ttl"), &[], None).unwrap_err();
        assert!(matches!(err, KgError::FileNotFound(_)));
    }

    #[test]
    fn test_unparseable_graph_is_reasoning_error() {
        let temp_dir = TempDir::new().unwrap();
        let kg = temp_dir.path().join("kg.ttl");
        fs::write(&kg, "not turtle at all").unwrap();
        let err = reason(&kg, &[], None).unwrap_err();
        assert!(matches!(err, KgError::Reasoning(_)));
    }
}
