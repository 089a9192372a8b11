//! Suggestion service used while preparing an RNR document
//!
//! The pipeline never calls it on its own: a human-edited RNR works the same.
//! [`IndexSuggester`] answers locally from the ontology index; remote or
//! model-backed services implement [`SuggestionService`] outside this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::{KgError, Result};
use crate::ontology::index::MIN_SCORE;
use crate::ontology::similarity::ratio;
use crate::ontology::{ClassSuggestion, OntologyIndex, TermKind};
use crate::rnr::model::mark_for_review;
use crate::rnr::RnrDocument;

const HTTP_METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// One operation of an OpenAPI document and how well it matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointMatch {
    pub path: String,
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub score: u8,
}

pub trait SuggestionService {
    /// Map a platform term to an ontology class or property
    fn map_term(&self, term: &str, kind: TermKind) -> Result<ClassSuggestion>;

    /// Best endpoint of an OpenAPI 2.0/3.x document for a free-text query
    fn match_endpoint(&self, query: &str, openapi: &Value) -> Result<Option<EndpointMatch>>;

    /// Fill the gaps of an RNR document with review-marked suggestions
    fn complete_rnr(&self, doc: &RnrDocument) -> Result<RnrDocument>;
}

pub struct IndexSuggester<'a> {
    index: &'a OntologyIndex,
}

impl<'a> IndexSuggester<'a> {
    pub fn new(index: &'a OntologyIndex) -> Self {
        Self { index }
    }
}

impl SuggestionService for IndexSuggester<'_> {
    fn map_term(&self, term: &str, kind: TermKind) -> Result<ClassSuggestion> {
        let prefixes = self.index.prefixes();
        let suggestion = match kind {
            TermKind::Class => self.index.suggest_class(term, prefixes)?,
            TermKind::Property => self.index.suggest_property(term, prefixes)?,
        };
        Ok(suggestion)
    }

    fn match_endpoint(&self, query: &str, openapi: &Value) -> Result<Option<EndpointMatch>> {
        Ok(rank_endpoints(query, openapi)?.into_iter().next())
    }

    fn complete_rnr(&self, doc: &RnrDocument) -> Result<RnrDocument> {
        let mut completed = doc.clone();
        completed.context.merge(self.index.prefixes());

        let mut filled = 0usize;
        for record in &mut completed.data {
            for rel in &mut record.has_relationship {
                if rel.property_class.is_some() || rel.related_node_type.is_none() {
                    continue;
                }
                let suggestion = self
                    .index
                    .suggest_property(&rel.raw_data_identifier, &completed.context)?;
                debug!(
                    nodetype = %record.nodetype,
                    key = %rel.raw_data_identifier,
                    suggestion = %suggestion,
                    "propertyClass suggested"
                );
                rel.property_class = Some(mark_for_review(&suggestion.to_string()));
                filled += 1;
            }
        }
        info!(filled, "RNR completed with suggestions");
        Ok(completed)
    }
}

/// Every operation scoring at least [`MIN_SCORE`], best first
pub fn rank_endpoints(query: &str, openapi: &Value) -> Result<Vec<EndpointMatch>> {
    let paths = openapi
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| KgError::InputShape("OpenAPI document has no 'paths' object".to_string()))?;
    let base = base_url(openapi);
    let query = query.trim().to_lowercase();

    let mut matches = Vec::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else { continue };
        for method in HTTP_METHODS {
            let Some(operation) = item.get(method) else { continue };
            let operation_id = operation.get("operationId").and_then(Value::as_str).map(str::to_string);
            let summary = operation
                .get("summary")
                .or_else(|| operation.get("description"))
                .and_then(Value::as_str)
                .map(str::to_string);

            let mut fields = vec![path.clone(), format!("{} {}", method, path)];
            fields.extend(operation_id.iter().cloned());
            fields.extend(summary.iter().cloned());
            let score = fields
                .iter()
                .map(|f| ratio(&query, &f.to_lowercase()))
                .max()
                .unwrap_or(0);

            if score >= MIN_SCORE {
                matches.push(EndpointMatch {
                    path: path.clone(),
                    method: method.to_uppercase(),
                    url: format!("{}{}", base, path),
                    operation_id,
                    summary,
                    score,
                });
            }
        }
    }

    matches.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.method.cmp(&b.method))
    });
    Ok(matches)
}

/// Server prefix: `servers[0].url` (3.x) or scheme + host + basePath (2.0)
fn base_url(openapi: &Value) -> String {
    if let Some(url) = openapi
        .get("servers")
        .and_then(|s| s.get(0))
        .and_then(|s| s.get("url"))
        .and_then(Value::as_str)
    {
        return url.trim_end_matches('/').to_string();
    }

    let host = openapi.get("host").and_then(Value::as_str).unwrap_or_default();
    let base_path = openapi.get("basePath").and_then(Value::as_str).unwrap_or_default();
    if host.is_empty() {
        return base_path.trim_end_matches('/').to_string();
    }
    let scheme = openapi
        .get("schemes")
        .and_then(|s| s.get(0))
        .and_then(Value::as_str)
        .unwrap_or("http");
    format!("{}://{}{}", scheme, host, base_path.trim_end_matches('/'))
}
