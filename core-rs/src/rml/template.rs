//! R2RML string templates: `http://example.com/Room/{id}`
//!
//! `{ref}` names a reference into the current record; `\{` and `\}` are
//! literal braces.

use serde_json::Value;

use crate::errors::{KgError, Result};
use crate::jsonpath::{resolve_reference, scalar_to_string};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<Part>,
}

impl Template {
    pub fn parse(template: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped @ ('{' | '}' | '\\')) => text.push(escaped),
                    Some(other) => {
                        text.push('\\');
                        text.push(other);
                    }
                    None => text.push('\\'),
                },
                '{' => {
                    let mut reference = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => reference.push(ch),
                            None => {
                                return Err(KgError::Materialization(format!(
                                    "unclosed '{{' in template '{}'",
                                    template
                                )))
                            }
                        }
                    }
                    if reference.is_empty() {
                        return Err(KgError::Materialization(format!(
                            "empty reference in template '{}'",
                            template
                        )));
                    }
                    if !text.is_empty() {
                        parts.push(Part::Text(std::mem::take(&mut text)));
                    }
                    parts.push(Part::Reference(reference));
                }
                '}' => {
                    return Err(KgError::Materialization(format!(
                        "unbalanced '}}' in template '{}'",
                        template
                    )))
                }
                other => text.push(other),
            }
        }
        if !text.is_empty() {
            parts.push(Part::Text(text));
        }
        Ok(Self { parts })
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            Part::Reference(r) => Some(r.as_str()),
            Part::Text(_) => None,
        })
    }

    /// Every expansion for `record` (one per combination of multi-valued
    /// references). Empty when a reference has no value.
    pub fn expand(&self, record: &Value, iri_safe: bool) -> Vec<String> {
        let mut results = vec![String::new()];
        for part in &self.parts {
            match part {
                Part::Text(text) => {
                    for r in &mut results {
                        r.push_str(text);
                    }
                }
                Part::Reference(reference) => {
                    let values: Vec<String> = resolve_reference(record, reference)
                        .into_iter()
                        .filter_map(scalar_to_string)
                        .map(|v| if iri_safe { encode_iri_safe(&v) } else { v })
                        .collect();
                    if values.is_empty() {
                        return Vec::new();
                    }
                    results = results
                        .iter()
                        .flat_map(|prefix| values.iter().map(move |v| format!("{}{}", prefix, v)))
                        .collect();
                }
            }
        }
        results
    }
}

/// Percent-encode everything except RFC 3986 unreserved characters
pub fn encode_iri_safe(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => out.push(byte as char),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}
