/**
 * generator.rs
 * Validated RNR document -> RML mapping
 */

use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use super::model::{
    standard_prefixes, JoinCondition, LogicalSource, ObjectMap, PredicateObjectMap, RmlDocument, SubjectMap,
    TermType, TriplesMap, PLACEHOLDER_SOURCE,
};
use super::template::encode_iri_safe;
use crate::artifact;
use crate::config::pipeline::DEFAULT_BASE_IRI;
use crate::errors::{KgError, Result};
use crate::ontology::vocab::rdf;
use crate::ontology::PrefixMap;
use crate::rnr::{self, RnrDocument, RnrRecord};

pub const MAP_PREFIX: &str = "map";

pub struct RmlGenerator {
    base: String,
    id_key: String,
}

impl Default for RmlGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_IRI, "id")
    }
}

impl RmlGenerator {
    pub fn new(base: impl Into<String>, id_key: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
            id_key: id_key.into(),
        }
    }

    pub fn map_namespace(&self) -> String {
        format!("{}/mapping#", self.base)
    }

    /// Prefixes every mapping declares before the RNR context is merged
    fn base_prefixes(&self) -> PrefixMap {
        let mut prefixes = standard_prefixes();
        prefixes.insert(MAP_PREFIX, &self.map_namespace());
        prefixes
    }

    /// Problems that would stop [`generate`](Self::generate), without generating
    pub fn check(&self, doc: &RnrDocument) -> Vec<rnr::RnrProblem> {
        rnr::check(doc, &self.base_prefixes())
    }

    /// Build the mapping; the RNR document must pass validation
    pub fn generate(&self, doc: &RnrDocument) -> Result<RmlDocument> {
        let mut prefixes = self.base_prefixes();
        rnr::validate(doc, &prefixes)?;
        prefixes.merge(&doc.context);

        let map_iris = self.map_iris(doc);
        let mut triples_maps = Vec::with_capacity(doc.data.len());
        for record in &doc.data {
            triples_maps.push(self.triples_map(record, &prefixes, &map_iris)?);
        }

        info!(triples_maps = triples_maps.len(), base = %self.base, "RML mapping generated");
        Ok(RmlDocument {
            prefixes,
            triples_maps,
        })
    }

    /// Load the RNR file, generate and write the mapping
    pub fn generate_file(&self, rnr_path: &Path, output: &Path) -> Result<RmlDocument> {
        let doc = RnrDocument::load(rnr_path)?;
        let mapping = self.generate(&doc)?;
        artifact::write_atomic(output, mapping.to_turtle().as_bytes())?;
        info!(path = %output.display(), "RML mapping written");
        Ok(mapping)
    }

    /// nodetype -> TriplesMap IRI, with names made Turtle-safe and unique
    fn map_iris(&self, doc: &RnrDocument) -> HashMap<String, String> {
        let namespace = self.map_namespace();
        let mut used = HashSet::new();
        let mut iris = HashMap::new();
        for record in &doc.data {
            let base_name = sanitize_name(&record.nodetype);
            let mut name = base_name.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}_{}", base_name, n);
                n += 1;
            }
            iris.insert(record.nodetype.clone(), format!("{}{}", namespace, name));
        }
        iris
    }

    fn triples_map(
        &self,
        record: &RnrRecord,
        prefixes: &PrefixMap,
        map_iris: &HashMap<String, String>,
    ) -> Result<TriplesMap> {
        let nodetype = &record.nodetype;
        let class = expand(prefixes, &record.class, nodetype)?;

        let mut predicate_object_maps = Vec::new();
        for rel in &record.has_relationship {
            let Some(related) = &rel.related_node_type else {
                warn!(nodetype = %nodetype, key = %rel.raw_data_identifier, "relationship without relatedNodeType skipped");
                continue;
            };
            let property = rel.property_class.as_deref().ok_or_else(|| {
                KgError::RnrValidation(format!("'{}': relationship to '{}' has no propertyClass", nodetype, related))
            })?;
            let parent = map_iris.get(related).ok_or_else(|| {
                KgError::RnrValidation(format!("'{}': relatedNodeType '{}' does not name a record", nodetype, related))
            })?;

            predicate_object_maps.push(PredicateObjectMap {
                predicate: expand(prefixes, property, nodetype)?,
                object_map: ObjectMap::Parent {
                    parent: parent.clone(),
                    join_conditions: vec![JoinCondition {
                        child: rel.raw_data_identifier.clone(),
                        parent: self.id_key.clone(),
                    }],
                },
            });
        }

        if let Some(access) = &record.has_data_access {
            predicate_object_maps.push(PredicateObjectMap {
                predicate: rdf::VALUE.as_str().to_string(),
                object_map: ObjectMap::Template {
                    template: access.replace("{id}", &format!("{{{}}}", self.id_key)),
                    term_type: TermType::Iri,
                },
            });
        }

        Ok(TriplesMap {
            iri: map_iris[nodetype].clone(),
            logical_source: LogicalSource {
                source: PLACEHOLDER_SOURCE.to_string(),
                iterator: record.iterator.trim().to_string(),
            },
            subject_map: SubjectMap {
                template: format!("{}/{}/{{{}}}", self.base, encode_iri_safe(nodetype), self.id_key),
                classes: vec![class],
            },
            predicate_object_maps,
        })
    }
}

fn expand(prefixes: &PrefixMap, value: &str, nodetype: &str) -> Result<String> {
    prefixes.expand(value).ok_or_else(|| {
        KgError::RnrValidation(format!("'{}': cannot resolve '{}' to an IRI", nodetype, value))
    })
}

fn sanitize_name(nodetype: &str) -> String {
    let mut name: String = nodetype
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        name.insert_str(0, "TM_");
    }
    name
}
