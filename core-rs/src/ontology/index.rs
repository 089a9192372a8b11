/**
 * index.rs
 * Ontology term index: per-file extraction through SPARQL, sidecar caching,
 * and merging of same-named terms across ontology files
 */

use oxigraph::io::RdfFormat;
use oxigraph::store::Store;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::prefixes::PrefixMap;
use super::query::{QueryRow, SparqlQuery};
use super::similarity::ratio;
use super::vocab::{owl, rdfs, skos};
use super::OntologyError;
use crate::artifact;
use crate::rdfio;

pub const SIDECAR_SUFFIX: &str = "_index.json";
const SIDECAR_VERSION: u32 = 1;

/// Single suggestion only at or above this score...
pub const HIGH_THRESHOLD: u8 = 90;
/// ...and only when the runner-up trails by more than this
pub const CLOSE_GAP: u8 = 5;
/// Candidates below this score are dropped
pub const MIN_SCORE: u8 = 50;
pub const MAX_CANDIDATES: usize = 3;

pub const NOT_FOUND_MARKER: &str = "(NOT FOUND)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermKind {
    Class,
    Property,
}

/// Where a description came from; higher wins when merging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionSource {
    #[default]
    None,
    Comment,
    Definition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyTerm {
    pub local_name: String,
    pub uri: String,
    pub prefixed_form: String,
    pub kind: TermKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub description_source: DescriptionSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub superclasses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subclasses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equivalent_classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub characteristics: Vec<String>,
    pub sources: Vec<String>,
}

impl OntologyTerm {
    /// Fold another definition of the same local name into this one
    pub fn absorb(&mut self, other: OntologyTerm) {
        union_into(&mut self.sources, other.sources);

        if self.label.is_none() {
            self.label = other.label;
        }

        match other.description_source.cmp(&self.description_source) {
            Ordering::Greater => {
                self.description = other.description;
                self.description_source = other.description_source;
            }
            Ordering::Equal => {
                if let Some(text) = other.description {
                    match &mut self.description {
                        Some(current) if current.contains(text.as_str()) => {}
                        Some(current) => {
                            current.push(' ');
                            current.push_str(&text);
                        }
                        None => self.description = Some(text),
                    }
                }
            }
            Ordering::Less => {}
        }

        union_into(&mut self.superclasses, other.superclasses);
        union_into(&mut self.subclasses, other.subclasses);
        union_into(&mut self.equivalent_classes, other.equivalent_classes);
        union_into(&mut self.domains, other.domains);
        union_into(&mut self.ranges, other.ranges);
        union_into(&mut self.characteristics, other.characteristics);
    }

    fn search_keys(&self) -> Vec<String> {
        let mut keys = vec![self.local_name.to_lowercase()];
        if let Some(label) = &self.label {
            keys.push(label.to_lowercase());
        }
        keys
    }
}

fn union_into(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

// =============================================================================
// Per-file index
// =============================================================================

/// Terms extracted from one ontology file; this is what the sidecar stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileIndex {
    version: u32,
    pub source: String,
    pub checksum: String,
    pub prefixes: PrefixMap,
    pub classes: Vec<OntologyTerm>,
    pub properties: Vec<OntologyTerm>,
}

impl FileIndex {
    /// Reuse the sidecar when its checksum matches the file, else rebuild and rewrite it
    pub fn load_or_build(path: &Path, cache_dir: Option<&Path>) -> Result<Self, OntologyError> {
        if !path.exists() {
            return Err(OntologyError::NotFound(path.display().to_string()));
        }
        let bytes = fs::read(path)?;
        let checksum = checksum(&bytes);
        let sidecar = Self::sidecar_path(path, cache_dir);

        if let Some(cached) = Self::read_sidecar(&sidecar) {
            if cached.version == SIDECAR_VERSION && cached.checksum == checksum {
                debug!(ontology = %path.display(), sidecar = %sidecar.display(), "using cached index");
                return Ok(cached);
            }
            debug!(ontology = %path.display(), "cached index is stale, rebuilding");
        }

        let format = rdfio::format_for_path(path)
            .ok_or_else(|| OntologyError::UnsupportedFormat(path.display().to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| OntologyError::ParseError(format!("{}: {}", path.display(), e)))?;

        let index = Self::from_text(&text, format, &path.display().to_string(), checksum)?;
        if let Err(e) = artifact::write_json(&sidecar, &index) {
            warn!(sidecar = %sidecar.display(), error = %e, "could not write index cache");
        }
        Ok(index)
    }

    /// `<dir>/Brick.ttl` -> `<dir>/Brick_index.json`, or the same name inside `cache_dir`
    pub fn sidecar_path(path: &Path, cache_dir: Option<&Path>) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = format!("{}{}", stem, SIDECAR_SUFFIX);
        match cache_dir {
            Some(dir) => dir.join(name),
            None => path.with_file_name(name),
        }
    }

    fn read_sidecar(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(index) => Some(index),
            Err(e) => {
                debug!(sidecar = %path.display(), error = %e, "ignoring unreadable index cache");
                None
            }
        }
    }

    /// Extract classes and properties from ontology text
    pub fn from_text(
        text: &str,
        format: RdfFormat,
        source: &str,
        checksum: String,
    ) -> Result<Self, OntologyError> {
        let store = Store::new().map_err(|e| OntologyError::StoreError(e.to_string()))?;
        store
            .load_from_reader(format, text.as_bytes())
            .map_err(|e| OntologyError::ParseError(format!("{}: {}", source, e)))?;

        let prefixes = PrefixMap::extract(text);
        let facts = TermFacts::collect(&store)?;

        let classes = extract_terms(&store, SparqlQuery::classes(), TermKind::Class, &facts, &prefixes)?;
        let properties =
            extract_terms(&store, SparqlQuery::properties(), TermKind::Property, &facts, &prefixes)?;

        debug!(
            source,
            classes = classes.len(),
            properties = properties.len(),
            prefixes = prefixes.len(),
            "ontology file indexed"
        );

        Ok(Self {
            version: SIDECAR_VERSION,
            source: source.to_string(),
            checksum,
            prefixes,
            classes,
            properties,
        })
    }
}

fn checksum(bytes: &[u8]) -> String {
    format!("{:08x}", crc32fast::hash(bytes))
}

/// Per-term facts fetched with one query per predicate
struct TermFacts {
    labels: HashMap<String, Vec<QueryRow>>,
    comments: HashMap<String, Vec<String>>,
    definitions: HashMap<String, Vec<String>>,
    superclasses: HashMap<String, Vec<String>>,
    subclasses: HashMap<String, Vec<String>>,
    equivalents: HashMap<String, Vec<String>>,
    domains: HashMap<String, Vec<String>>,
    ranges: HashMap<String, Vec<String>>,
    characteristics: HashMap<String, Vec<String>>,
}

impl TermFacts {
    fn collect(store: &Store) -> Result<Self, OntologyError> {
        let labels = group_rows(SparqlQuery::annotations(rdfs::LABEL.as_str()).select(store)?);
        let comments = group_values(SparqlQuery::annotations(rdfs::COMMENT.as_str()).select(store)?, "value");
        let definitions =
            group_values(SparqlQuery::annotations(skos::DEFINITION.as_str()).select(store)?, "value");

        let superclasses = group_values(
            SparqlQuery::links(&format!("<{}>+", rdfs::SUB_CLASS_OF.as_str())).select(store)?,
            "value",
        );
        let mut subclasses: HashMap<String, Vec<String>> = HashMap::new();
        for (term, supers) in &superclasses {
            for sup in supers {
                subclasses.entry(sup.clone()).or_default().push(term.clone());
            }
        }
        for subs in subclasses.values_mut() {
            subs.sort();
        }

        let eq = owl::EQUIVALENT_CLASS.as_str();
        let equivalents =
            group_values(SparqlQuery::links(&format!("(<{}>|^<{}>)", eq, eq)).select(store)?, "value");
        let domains = group_values(
            SparqlQuery::links(&format!("<{}>", rdfs::DOMAIN.as_str())).select(store)?,
            "value",
        );
        let ranges = group_values(
            SparqlQuery::links(&format!("<{}>", rdfs::RANGE.as_str())).select(store)?,
            "value",
        );
        let characteristics = group_values(SparqlQuery::characteristics().select(store)?, "kind");

        Ok(Self {
            labels,
            comments,
            definitions,
            superclasses,
            subclasses,
            equivalents,
            domains,
            ranges,
            characteristics,
        })
    }

    fn list(map: &HashMap<String, Vec<String>>, uri: &str) -> Vec<String> {
        map.get(uri).cloned().unwrap_or_default()
    }

    /// Untagged or English label first, else the first one
    fn label(&self, uri: &str) -> Option<String> {
        let rows = self.labels.get(uri)?;
        let usable = |row: &&QueryRow| row.get("value").map_or(false, |v| !v.trim().is_empty());
        rows.iter()
            .filter(usable)
            .find(|row| {
                let lang = row.get("lang").map(String::as_str).unwrap_or("");
                lang.is_empty() || lang.starts_with("en")
            })
            .or_else(|| rows.iter().find(usable))
            .and_then(|row| row.get("value"))
            .map(|v| v.trim().to_string())
    }

    fn description(&self, uri: &str) -> (Option<String>, DescriptionSource) {
        let joined = |texts: &[String]| {
            let mut parts: Vec<&str> = Vec::new();
            for text in texts.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
                if !parts.contains(&text) {
                    parts.push(text);
                }
            }
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        };

        if let Some(text) = self.definitions.get(uri).and_then(|d| joined(d)) {
            return (Some(text), DescriptionSource::Definition);
        }
        if let Some(text) = self.comments.get(uri).and_then(|c| joined(c)) {
            return (Some(text), DescriptionSource::Comment);
        }
        (None, DescriptionSource::None)
    }
}

fn group_rows(rows: Vec<QueryRow>) -> HashMap<String, Vec<QueryRow>> {
    let mut grouped: HashMap<String, Vec<QueryRow>> = HashMap::new();
    for row in rows {
        if let Some(term) = row.get("term").cloned() {
            grouped.entry(term).or_default().push(row);
        }
    }
    grouped
}

fn group_values(rows: Vec<QueryRow>, value_var: &str) -> HashMap<String, Vec<String>> {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        if let (Some(term), Some(value)) = (row.get("term"), row.get(value_var)) {
            grouped.entry(term.clone()).or_default().push(value.clone());
        }
    }
    grouped
}

fn extract_terms(
    store: &Store,
    query: SparqlQuery,
    kind: TermKind,
    facts: &TermFacts,
    prefixes: &PrefixMap,
) -> Result<Vec<OntologyTerm>, OntologyError> {
    let mut terms = Vec::new();
    for row in query.select(store)? {
        let Some(uri) = row.get("term") else { continue };
        match build_term(uri, kind, facts, prefixes) {
            Ok(Some(term)) => terms.push(term),
            Ok(None) => debug!(uri = %uri, "skipping shape term"),
            Err(e) => warn!(uri = %uri, error = %e, "skipping ontology term"),
        }
    }
    Ok(terms)
}

fn build_term(
    uri: &str,
    kind: TermKind,
    facts: &TermFacts,
    prefixes: &PrefixMap,
) -> Result<Option<OntologyTerm>, OntologyError> {
    let local = local_name(uri)
        .ok_or_else(|| OntologyError::LoadError(format!("no local name in {}", uri)))?;
    if is_shape(uri, local) {
        return Ok(None);
    }
    let prefixed_form = prefixes.to_prefixed(uri)?;
    let (description, description_source) = facts.description(uri);

    let characteristics = TermFacts::list(&facts.characteristics, uri)
        .iter()
        .map(|kind_uri| characteristic_name(kind_uri).to_string())
        .collect();

    let (superclasses, subclasses, equivalent_classes) = match kind {
        TermKind::Class => (
            TermFacts::list(&facts.superclasses, uri),
            TermFacts::list(&facts.subclasses, uri),
            TermFacts::list(&facts.equivalents, uri),
        ),
        TermKind::Property => (Vec::new(), Vec::new(), Vec::new()),
    };

    Ok(Some(OntologyTerm {
        local_name: local.to_string(),
        uri: uri.to_string(),
        prefixed_form,
        kind,
        label: facts.label(uri),
        description,
        description_source,
        superclasses,
        subclasses,
        equivalent_classes,
        domains: TermFacts::list(&facts.domains, uri),
        ranges: TermFacts::list(&facts.ranges, uri),
        characteristics,
        sources: vec![uri.to_string()],
    }))
}

fn characteristic_name(kind_uri: &str) -> &str {
    match kind_uri {
        u if u == owl::TRANSITIVE_PROPERTY.as_str() => "transitive",
        u if u == owl::SYMMETRIC_PROPERTY.as_str() => "symmetric",
        u if u == owl::FUNCTIONAL_PROPERTY.as_str() => "functional",
        u if u == owl::INVERSE_FUNCTIONAL_PROPERTY.as_str() => "inverse_functional",
        other => other,
    }
}

/// Text after the last `#`, `/` or `:`
pub fn local_name(uri: &str) -> Option<&str> {
    let start = uri.rfind(|c: char| c == '#' || c == '/' || c == ':')? + 1;
    let local = &uri[start..];
    if local.is_empty() {
        None
    } else {
        Some(local)
    }
}

fn is_shape(uri: &str, local: &str) -> bool {
    let namespace = uri[..uri.len() - local.len()].to_lowercase();
    namespace.contains("shape") || namespace.contains("shacl") || local.ends_with("Shape")
}

// =============================================================================
// Merged index
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ClassSuggestion {
    /// One confident match, as a prefixed IRI
    Single(String),
    /// Close or weak matches, best first
    Candidates(Vec<String>),
    /// Nothing scored high enough; carries the input term
    NotFound(String),
}

impl ClassSuggestion {
    pub fn best(&self) -> Option<&str> {
        match self {
            ClassSuggestion::Single(s) => Some(s),
            ClassSuggestion::Candidates(c) => c.first().map(String::as_str),
            ClassSuggestion::NotFound(_) => None,
        }
    }
}

impl fmt::Display for ClassSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassSuggestion::Single(s) => write!(f, "{}", s),
            ClassSuggestion::Candidates(c) => write!(f, "{}", c.join(" | ")),
            ClassSuggestion::NotFound(term) => write!(f, "{} {}", term, NOT_FOUND_MARKER),
        }
    }
}

/// Classes and properties of all loaded ontologies, keyed by local name.
/// Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct OntologyIndex {
    prefixes: PrefixMap,
    classes: BTreeMap<String, OntologyTerm>,
    properties: BTreeMap<String, OntologyTerm>,
    sources: Vec<String>,
}

impl OntologyIndex {
    /// Index every ontology file (directories expanded), using sidecar caches
    pub fn build(paths: &[PathBuf], cache_dir: Option<&Path>) -> Result<Self, OntologyError> {
        let files = expand_sources(paths)?;
        let mut indexes = Vec::with_capacity(files.len());
        for file in &files {
            indexes.push(FileIndex::load_or_build(file, cache_dir)?);
        }
        let index = Self::from_files(indexes);
        info!(
            files = files.len(),
            classes = index.classes.len(),
            properties = index.properties.len(),
            "ontology index built"
        );
        Ok(index)
    }

    /// Merge per-file indexes in order; earlier files take precedence
    pub fn from_files(files: Vec<FileIndex>) -> Self {
        let mut index = Self::default();
        for file in files {
            index.prefixes.merge(&file.prefixes);
            index.sources.push(file.source);
            for term in file.classes {
                merge_term(&mut index.classes, term);
            }
            for term in file.properties {
                merge_term(&mut index.properties, term);
            }
        }
        index
    }

    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn classes(&self) -> impl Iterator<Item = &OntologyTerm> {
        self.classes.values()
    }

    pub fn properties(&self) -> impl Iterator<Item = &OntologyTerm> {
        self.properties.values()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.properties.is_empty()
    }

    pub fn class(&self, local_name: &str) -> Option<&OntologyTerm> {
        self.classes.get(local_name)
    }

    pub fn property(&self, local_name: &str) -> Option<&OntologyTerm> {
        self.properties.get(local_name)
    }

    /// Class first, then property
    pub fn term(&self, local_name: &str) -> Option<&OntologyTerm> {
        self.class(local_name).or_else(|| self.property(local_name))
    }

    pub fn convert_uri_to_prefixed(&self, uri: &str) -> Result<String, OntologyError> {
        self.prefixes.to_prefixed(uri)
    }

    pub fn expand_prefixed(&self, curie: &str) -> Option<String> {
        self.prefixes.expand(curie)
    }

    /// Suggest a class for an entity type name such as `CO2Sensor` or `airFlow_Fan`
    pub fn suggest_class(&self, term: &str, prefixes: &PrefixMap) -> Result<ClassSuggestion, OntologyError> {
        if self.is_empty() {
            return Err(OntologyError::OntologyEmpty);
        }
        Ok(suggest(self.classes.values(), term, &class_keyword(term), prefixes))
    }

    /// Suggest a property for a relationship key such as `hasLocation.value`
    pub fn suggest_property(&self, term: &str, prefixes: &PrefixMap) -> Result<ClassSuggestion, OntologyError> {
        if self.is_empty() {
            return Err(OntologyError::OntologyEmpty);
        }
        let keyword = term.split('.').next().unwrap_or(term).to_lowercase();
        Ok(suggest(self.properties.values(), term, &keyword, prefixes))
    }
}

fn merge_term(terms: &mut BTreeMap<String, OntologyTerm>, term: OntologyTerm) {
    match terms.get_mut(&term.local_name) {
        Some(existing) => existing.absorb(term),
        None => {
            terms.insert(term.local_name.clone(), term);
        }
    }
}

/// First `_`-separated token, lowercased
fn class_keyword(term: &str) -> String {
    term.split('_').next().unwrap_or(term).to_lowercase()
}

fn suggest<'a, I>(terms: I, term: &str, keyword: &str, prefixes: &PrefixMap) -> ClassSuggestion
where
    I: Iterator<Item = &'a OntologyTerm>,
{
    let mut scored: Vec<(u8, String)> = terms
        .map(|t| {
            let score = t.search_keys().iter().map(|k| ratio(keyword, k)).max().unwrap_or(0);
            let rendered = prefixes
                .to_prefixed(&t.uri)
                .unwrap_or_else(|_| t.prefixed_form.clone());
            (score, rendered)
        })
        .filter(|(score, _)| *score >= MIN_SCORE)
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);

    let Some((top, best)) = scored.first().cloned() else {
        return ClassSuggestion::NotFound(term.to_string());
    };
    let clear_lead = scored
        .get(1)
        .map_or(true, |(runner_up, _)| top.saturating_sub(*runner_up) > CLOSE_GAP);

    if top >= HIGH_THRESHOLD && clear_lead {
        ClassSuggestion::Single(best)
    } else {
        ClassSuggestion::Candidates(
            scored
                .into_iter()
                .take(MAX_CANDIDATES)
                .map(|(_, name)| name)
                .collect(),
        )
    }
}

/// Files as given; directories walked recursively in name order for RDF files
pub fn expand_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>, OntologyError> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(OntologyError::NotFound(path.display().to_string()));
        }
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let before = files.len();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| OntologyError::LoadError(e.to_string()))?;
            let candidate = entry.path();
            let is_sidecar = candidate
                .file_name()
                .map_or(false, |n| n.to_string_lossy().ends_with(SIDECAR_SUFFIX));
            if entry.file_type().is_file() && !is_sidecar && rdfio::format_for_path(candidate).is_some() {
                files.push(candidate.to_path_buf());
            }
        }
        if files.len() == before {
            warn!(dir = %path.display(), "ontology directory contains no RDF files");
        }
    }
    Ok(files)
}
