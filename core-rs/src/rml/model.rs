/**
 * model.rs
 * Typed RML document and its Turtle serialization
 *
 * All IRIs in the model are absolute; prefixed names are only produced when
 * writing Turtle.
 */

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::errors::{KgError, Result};
use crate::ontology::vocab::{rdf, rml};
use crate::ontology::PrefixMap;

pub const PLACEHOLDER_SOURCE: &str = "placeholder.json";

#[derive(Debug, Clone, PartialEq)]
pub struct RmlDocument {
    pub prefixes: PrefixMap,
    pub triples_maps: Vec<TriplesMap>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriplesMap {
    /// IRI (or `_:label` for blank nodes read back from Turtle)
    pub iri: String,
    pub logical_source: LogicalSource,
    pub subject_map: SubjectMap,
    pub predicate_object_maps: Vec<PredicateObjectMap>,
}

/// Reference formulation is always `ql:JSONPath`
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalSource {
    pub source: String,
    pub iterator: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectMap {
    pub template: String,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredicateObjectMap {
    pub predicate: String,
    pub object_map: ObjectMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermType {
    Iri,
    Literal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMap {
    Template {
        template: String,
        term_type: TermType,
    },
    Reference {
        reference: String,
        term_type: TermType,
        datatype: Option<String>,
    },
    Constant(String),
    Parent {
        parent: String,
        join_conditions: Vec<JoinCondition>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    pub child: String,
    pub parent: String,
}

/// Prefixes every generated mapping declares
pub fn standard_prefixes() -> PrefixMap {
    let mut prefixes = PrefixMap::new();
    prefixes.insert("rr", rml::RR_NS);
    prefixes.insert("rml", rml::RML_NS);
    prefixes.insert("ql", rml::QL_NS);
    prefixes.insert("rdf", rdf::NS);
    prefixes
}

impl RmlDocument {
    pub fn triples_map(&self, iri: &str) -> Option<&TriplesMap> {
        self.triples_maps.iter().find(|m| m.iri == iri)
    }

    /// Two TriplesMaps sharing a subject template would mint the same IRIs
    pub fn check_unique_subjects(&self) -> Result<()> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for map in &self.triples_maps {
            if let Some(other) = seen.insert(map.subject_map.template.as_str(), map.iri.as_str()) {
                return Err(KgError::Materialization(format!(
                    "subject template '{}' is shared by {} and {}",
                    map.subject_map.template, other, map.iri
                )));
            }
        }
        Ok(())
    }

    pub fn to_turtle(&self) -> String {
        let mut out = String::new();
        for (prefix, namespace) in self.prefixes.iter() {
            let _ = writeln!(out, "@prefix {}: <{}> .", prefix, namespace);
        }

        for map in &self.triples_maps {
            out.push('\n');
            self.write_triples_map(&mut out, map);
        }
        out
    }

    fn write_triples_map(&self, out: &mut String, map: &TriplesMap) {
        let _ = writeln!(out, "{} a {} ;", self.node(&map.iri), self.node(rml::TRIPLES_MAP.as_str()));

        let _ = writeln!(out, "    {} [", self.node(rml::LOGICAL_SOURCE.as_str()));
        let _ = writeln!(
            out,
            "        {} {} ;",
            self.node(rml::SOURCE.as_str()),
            literal(&map.logical_source.source)
        );
        let _ = writeln!(
            out,
            "        {} {} ;",
            self.node(rml::REFERENCE_FORMULATION.as_str()),
            self.node(rml::JSONPATH.as_str())
        );
        let _ = writeln!(
            out,
            "        {} {}",
            self.node(rml::ITERATOR.as_str()),
            literal(&map.logical_source.iterator)
        );
        let _ = write!(out, "    ] ;\n    {} [\n", self.node(rml::SUBJECT_MAP.as_str()));

        let mut subject_lines = vec![format!(
            "{} {}",
            self.node(rml::TEMPLATE.as_str()),
            literal(&map.subject_map.template)
        )];
        for class in &map.subject_map.classes {
            subject_lines.push(format!("{} {}", self.node(rml::CLASS.as_str()), self.node(class)));
        }
        write_block_lines(out, &subject_lines, 8);
        out.push_str("    ]");

        for pom in &map.predicate_object_maps {
            let _ = write!(out, " ;\n    {} [\n", self.node(rml::PREDICATE_OBJECT_MAP.as_str()));
            let _ = writeln!(
                out,
                "        {} {} ;",
                self.node(rml::PREDICATE.as_str()),
                self.node(&pom.predicate)
            );
            let _ = writeln!(out, "        {} [", self.node(rml::OBJECT_MAP.as_str()));
            write_block_lines(out, &self.object_map_lines(&pom.object_map), 12);
            out.push_str("        ]\n    ]");
        }
        out.push_str(" .\n");
    }

    fn object_map_lines(&self, object_map: &ObjectMap) -> Vec<String> {
        let mut lines = Vec::new();
        match object_map {
            ObjectMap::Template { template, term_type } => {
                lines.push(format!("{} {}", self.node(rml::TEMPLATE.as_str()), literal(template)));
                if *term_type == TermType::Literal {
                    lines.push(self.term_type_line(TermType::Literal));
                }
            }
            ObjectMap::Reference {
                reference,
                term_type,
                datatype,
            } => {
                lines.push(format!("{} {}", self.node(rml::REFERENCE.as_str()), literal(reference)));
                if *term_type == TermType::Iri {
                    lines.push(self.term_type_line(TermType::Iri));
                }
                if let Some(datatype) = datatype {
                    lines.push(format!("{} {}", self.node(rml::DATATYPE.as_str()), self.node(datatype)));
                }
            }
            ObjectMap::Constant(iri) => {
                lines.push(format!("{} {}", self.node(rml::CONSTANT.as_str()), self.node(iri)));
            }
            ObjectMap::Parent {
                parent,
                join_conditions,
            } => {
                lines.push(format!(
                    "{} {}",
                    self.node(rml::PARENT_TRIPLES_MAP.as_str()),
                    self.node(parent)
                ));
                for join in join_conditions {
                    lines.push(format!(
                        "{} [ {} {} ; {} {} ]",
                        self.node(rml::JOIN_CONDITION.as_str()),
                        self.node(rml::CHILD.as_str()),
                        literal(&join.child),
                        self.node(rml::PARENT.as_str()),
                        literal(&join.parent)
                    ));
                }
            }
        }
        lines
    }

    fn term_type_line(&self, term_type: TermType) -> String {
        let value = match term_type {
            TermType::Iri => rml::IRI.as_str(),
            TermType::Literal => rml::LITERAL.as_str(),
        };
        format!("{} {}", self.node(rml::TERM_TYPE.as_str()), self.node(value))
    }

    /// `prefix:Local` when the local part is a safe Turtle name, else `<iri>`
    fn node(&self, iri: &str) -> String {
        if let Some(label) = iri.strip_prefix("_:") {
            return format!("_:{}", label);
        }
        match self.prefixes.to_prefixed(iri) {
            Ok(curie) if is_safe_local(curie.split_once(':').map_or("", |(_, l)| l)) => curie,
            _ => format!("<{}>", iri),
        }
    }
}

fn write_block_lines(out: &mut String, lines: &[String], indent: usize) {
    let pad = " ".repeat(indent);
    for (i, line) in lines.iter().enumerate() {
        let sep = if i + 1 < lines.len() { " ;" } else { "" };
        let _ = writeln!(out, "{}{}{}", pad, line, sep);
    }
}

fn is_safe_local(local: &str) -> bool {
    let mut chars = local.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => {}
        _ => return false,
    }
    local.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Turtle double-quoted string literal
pub fn literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
