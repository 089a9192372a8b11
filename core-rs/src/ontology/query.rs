/**
 * query.rs
 * SPARQL query builders and a row-oriented SELECT runner over an oxigraph Store
 */

use oxigraph::model::Term;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use std::collections::BTreeMap;

use super::OntologyError;

/// One solution: variable name -> plain term value (IRI without brackets,
/// literal lexical form, `_:id` for blank nodes). Unbound variables are absent.
pub type QueryRow = BTreeMap<String, String>;

pub struct SparqlQuery {
    query: String,
}

impl SparqlQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.query
    }

    /// Run a SELECT (or ASK) query and collect its rows
    pub fn select(&self, store: &Store) -> Result<Vec<QueryRow>, OntologyError> {
        let results = store
            .query(self.query.as_str())
            .map_err(|e| OntologyError::QueryError(e.to_string()))?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| OntologyError::QueryError(e.to_string()))?;
                    let mut row = QueryRow::new();
                    for (var, term) in solution.iter() {
                        row.insert(var.as_str().to_string(), term_value(term));
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            QueryResults::Boolean(result) => {
                let mut row = QueryRow::new();
                row.insert("result".to_string(), result.to_string());
                Ok(vec![row])
            }
            QueryResults::Graph(_) => Err(OntologyError::QueryError(
                "CONSTRUCT/DESCRIBE queries are not supported here".to_string(),
            )),
        }
    }

    // =========================================================================
    // Ontology index extraction queries
    // =========================================================================

    /// IRIs typed rdfs:Class or owl:Class
    pub fn classes() -> Self {
        Self::new(
            r#"
            PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
            PREFIX owl: <http://www.w3.org/2002/07/owl#>

            SELECT DISTINCT ?term
            WHERE {
                { ?term a rdfs:Class } UNION { ?term a owl:Class }
                FILTER(isIRI(?term))
            }
            ORDER BY ?term
            "#,
        )
    }

    /// IRIs typed rdf:Property, owl:ObjectProperty or owl:DatatypeProperty
    pub fn properties() -> Self {
        Self::new(
            r#"
            PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
            PREFIX owl: <http://www.w3.org/2002/07/owl#>

            SELECT DISTINCT ?term
            WHERE {
                VALUES ?kind { rdf:Property owl:ObjectProperty owl:DatatypeProperty }
                ?term a ?kind .
                FILTER(isIRI(?term))
            }
            ORDER BY ?term
            "#,
        )
    }

    /// (term, value, lang) for a literal-valued annotation predicate
    pub fn annotations(predicate_iri: &str) -> Self {
        Self::new(format!(
            r#"
            SELECT ?term ?value (LANG(?value) AS ?lang)
            WHERE {{
                ?term <{}> ?value .
                FILTER(isIRI(?term) && isLiteral(?value))
            }}
            ORDER BY ?term ?value
            "#,
            predicate_iri
        ))
    }

    /// (term, value) for an IRI-valued predicate; `path` may be a property path
    pub fn links(path: &str) -> Self {
        Self::new(format!(
            r#"
            SELECT DISTINCT ?term ?value
            WHERE {{
                ?term {} ?value .
                FILTER(isIRI(?term) && isIRI(?value) && ?term != ?value)
            }}
            ORDER BY ?term ?value
            "#,
            path
        ))
    }

    /// (term, kind) for OWL property characteristics
    pub fn characteristics() -> Self {
        Self::new(
            r#"
            PREFIX owl: <http://www.w3.org/2002/07/owl#>

            SELECT ?term ?kind
            WHERE {
                VALUES ?kind {
                    owl:TransitiveProperty owl:SymmetricProperty
                    owl:FunctionalProperty owl:InverseFunctionalProperty
                }
                ?term a ?kind .
                FILTER(isIRI(?term))
            }
            ORDER BY ?term ?kind
            "#,
        )
    }
}

/// Plain string form of a term as used in query rows
pub fn term_value(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => node.as_str().to_string(),
        Term::BlankNode(node) => format!("_:{}", node.as_str()),
        Term::Literal(literal) => literal.value().to_string(),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}
