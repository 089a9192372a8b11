//! Namespace prefix handling
//!
//! Prefixes are read from the document text (`@prefix`, SPARQL-style `PREFIX`,
//! and `xmlns:` attributes in RDF/XML) so that every declared prefix is kept,
//! including ones no triple uses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::OntologyError;

static TURTLE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*@prefix\s+([A-Za-z0-9_.\-]*):\s*<([^>\s]*)>\s*\.").expect("valid regex")
});

static SPARQL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*PREFIX\s+([A-Za-z0-9_.\-]*):\s*<([^>\s]*)>").expect("valid regex")
});

static XMLNS_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"xmlns:([A-Za-z0-9_.\-]+)\s*=\s*"([^"]+)""#).expect("valid regex")
});

/// prefix name -> namespace IRI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixMap {
    prefixes: BTreeMap<String, String>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every prefix declared in an RDF document's text.
    /// A later declaration of the same prefix replaces the earlier one.
    pub fn extract(text: &str) -> Self {
        let mut map = Self::new();
        for re in [&*TURTLE_PREFIX, &*SPARQL_PREFIX, &*XMLNS_PREFIX] {
            for caps in re.captures_iter(text) {
                map.insert(&caps[1], &caps[2]);
            }
        }
        map
    }

    pub fn insert(&mut self, prefix: &str, namespace: &str) {
        self.prefixes.insert(prefix.to_string(), namespace.to_string());
    }

    /// Add prefixes from `other` that are not yet bound here
    pub fn merge(&mut self, other: &PrefixMap) {
        for (prefix, namespace) in &other.prefixes {
            self.prefixes
                .entry(prefix.clone())
                .or_insert_with(|| namespace.clone());
        }
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }

    /// Render `uri` as `prefix:LocalName`.
    ///
    /// A namespace matches when the remainder is non-empty and holds no `/` or
    /// `#`. Among matches the shortest namespace wins, ties by prefix name.
    /// The empty prefix renders as `:LocalName`.
    pub fn to_prefixed(&self, uri: &str) -> Result<String, OntologyError> {
        self.prefixes
            .iter()
            .filter_map(|(prefix, ns)| {
                let local = uri.strip_prefix(ns.as_str())?;
                if local.is_empty() || local.contains('/') || local.contains('#') {
                    return None;
                }
                Some((ns.len(), prefix.as_str(), local))
            })
            .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)))
            .map(|(_, prefix, local)| format!("{}:{}", prefix, local))
            .ok_or_else(|| OntologyError::UnresolvedPrefix(uri.to_string()))
    }

    /// Expand `prefix:Local` (or `<iri>` / an absolute IRI) to a full IRI
    pub fn expand(&self, curie: &str) -> Option<String> {
        let curie = curie.trim();
        if let Some(inner) = curie.strip_prefix('<').and_then(|c| c.strip_suffix('>')) {
            return Some(inner.to_string());
        }
        if curie.contains("://") || curie.starts_with("urn:") {
            return Some(curie.to_string());
        }
        let (prefix, local) = curie.split_once(':')?;
        self.get(prefix).map(|ns| format!("{}{}", ns, local))
    }
}

impl FromIterator<(String, String)> for PrefixMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            prefixes: iter.into_iter().collect(),
        }
    }
}
