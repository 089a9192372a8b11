//! JSONPath subset used by RML iterators and extra-node selection
//!
//! Supported syntax:
//! - `$` root, `.name`, `['name']`, `.*` / `[*]`, `[n]` (negative counts from the end)
//! - `..name` / `..*` recursive descent
//! - `[?(@.a.b=='v')]`, `[?(@.a!=3)]`, `[?(@.a)]` filters over children
//!
//! Extra-node paths are limited to the restricted subset (`$`, `.`, `*` and
//! member names), see [`ensure_restricted`].

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum JsonPathError {
    #[error("Invalid JSONPath '{path}' at offset {offset}: {reason}")]
    Syntax {
        path: String,
        offset: usize,
        reason: String,
    },

    #[error("JSONPath '{path}' uses disallowed operator '{operator}' (only $, . and * are allowed here)")]
    Disallowed { path: String, operator: char },
}

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Child(String),
    Wildcard,
    Index(i64),
    Descendant(String),
    DescendantWildcard,
    Filter(Filter),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    Exists,
    Eq(Value),
    Ne(Value),
}

/// `[?(@.path op literal)]`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub path: Vec<String>,
    pub op: FilterOp,
}

/// Location of a match inside the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElem {
    Key(String),
    Index(usize),
}

#[derive(Debug, Clone)]
pub struct Match<'a> {
    pub path: Vec<PathElem>,
    pub value: &'a Value,
}

impl<'a> Match<'a> {
    /// Name of the innermost member on the path (`airFlowSetpoint` for `$.a.airFlowSetpoint`)
    pub fn leaf_name(&self) -> Option<&str> {
        self.path.iter().rev().find_map(|elem| match elem {
            PathElem::Key(k) => Some(k.as_str()),
            PathElem::Index(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    source: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Parse a path. A path without a leading `$` is taken relative to the root
    /// (`airFlowSetpoint` is `$.airFlowSetpoint`).
    pub fn parse(path: &str) -> Result<Self, JsonPathError> {
        let trimmed = path.trim();
        let normalized = if trimmed.starts_with('$') {
            trimmed.to_string()
        } else if trimmed.starts_with('.') || trimmed.starts_with('[') {
            format!("${}", trimmed)
        } else {
            format!("$.{}", trimmed)
        };

        let mut parser = Parser {
            src: &normalized,
            original: path,
            pos: 1,
        };
        let segments = parser.segments()?;

        Ok(Self {
            source: path.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Evaluate against `root`, returning matches in document order
    pub fn select<'a>(&self, root: &'a Value) -> Vec<Match<'a>> {
        let mut current = vec![Match {
            path: Vec::new(),
            value: root,
        }];

        for segment in &self.segments {
            let mut next = Vec::new();
            for m in current {
                apply_segment(segment, m, &mut next);
            }
            current = next;
        }

        current
    }

    /// Evaluate and return only the matched values
    pub fn select_values<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        self.select(root).into_iter().map(|m| m.value).collect()
    }
}

/// Reject anything outside `$`, `.`, `*` and plain member names.
pub fn ensure_restricted(path: &str) -> Result<(), JsonPathError> {
    const DISALLOWED: [char; 10] = ['?', '@', '[', ']', '(', ')', '=', '!', '\'', '"'];

    match path.chars().find(|c| DISALLOWED.contains(c)) {
        Some(operator) => Err(JsonPathError::Disallowed {
            path: path.to_string(),
            operator,
        }),
        None => {
            JsonPath::parse(path)?;
            Ok(())
        }
    }
}

/// Resolve an RML reference (`hasLocation.value`, `$.refs`) relative to a record.
///
/// Arrays met on the way fan out, and array leaves are flattened, so `refs`
/// yields every element of `refs`. Only scalars are returned.
pub fn resolve_reference<'a>(record: &'a Value, reference: &str) -> Vec<&'a Value> {
    let stripped = reference
        .trim()
        .trim_start_matches('$')
        .trim_start_matches('.');

    let mut current: Vec<&Value> = vec![record];
    if !stripped.is_empty() {
        for key in stripped.split('.') {
            let mut next = Vec::new();
            for value in current {
                collect_member(value, key, &mut next);
            }
            current = next;
        }
    }

    let mut out = Vec::new();
    for value in current {
        flatten_scalars(value, &mut out);
    }
    out
}

/// String form of a JSON scalar; `None` for null, arrays and objects
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn collect_member<'a>(value: &'a Value, key: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if let Some(v) = map.get(key) {
                out.push(v);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_member(item, key, out);
            }
        }
        _ => {}
    }
}

fn flatten_scalars<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_scalars(item, out);
            }
        }
        Value::String(_) | Value::Number(_) | Value::Bool(_) => out.push(value),
        _ => {}
    }
}

fn apply_segment<'a>(segment: &Segment, m: Match<'a>, out: &mut Vec<Match<'a>>) {
    match segment {
        Segment::Child(name) => {
            if let Value::Object(map) = m.value {
                if let Some(v) = map.get(name) {
                    out.push(child_match(&m, PathElem::Key(name.clone()), v));
                }
            }
        }
        Segment::Wildcard => push_children(&m, out),
        Segment::Index(idx) => {
            if let Value::Array(items) = m.value {
                let len = items.len() as i64;
                let resolved = if *idx < 0 { len + idx } else { *idx };
                if resolved >= 0 && resolved < len {
                    let i = resolved as usize;
                    out.push(child_match(&m, PathElem::Index(i), &items[i]));
                }
            }
        }
        Segment::Descendant(name) => {
            let mut nodes = Vec::new();
            descendants(m, true, &mut nodes);
            for node in nodes {
                if let Value::Object(map) = node.value {
                    if let Some(v) = map.get(name) {
                        out.push(child_match(&node, PathElem::Key(name.clone()), v));
                    }
                }
            }
        }
        Segment::DescendantWildcard => descendants(m, false, out),
        Segment::Filter(filter) => {
            let mut children = Vec::new();
            push_children(&m, &mut children);
            out.extend(children.into_iter().filter(|c| filter.accepts(c.value)));
        }
    }
}

fn child_match<'a>(parent: &Match<'a>, elem: PathElem, value: &'a Value) -> Match<'a> {
    let mut path = parent.path.clone();
    path.push(elem);
    Match { path, value }
}

fn push_children<'a>(m: &Match<'a>, out: &mut Vec<Match<'a>>) {
    match m.value {
        Value::Object(map) => {
            for (k, v) in map {
                out.push(child_match(m, PathElem::Key(k.clone()), v));
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                out.push(child_match(m, PathElem::Index(i), v));
            }
        }
        _ => {}
    }
}

fn descendants<'a>(m: Match<'a>, include_self: bool, out: &mut Vec<Match<'a>>) {
    let mut children = Vec::new();
    push_children(&m, &mut children);
    if include_self {
        out.push(m);
    }
    for child in children {
        descendants(child, true, out);
    }
}

impl Filter {
    fn accepts(&self, candidate: &Value) -> bool {
        let mut current = Some(candidate);
        for key in &self.path {
            current = current.and_then(|v| v.get(key));
        }

        match (&self.op, current) {
            (FilterOp::Exists, found) => found.is_some(),
            (FilterOp::Eq(expected), Some(found)) => values_equal(found, expected),
            (FilterOp::Eq(_), None) => false,
            (FilterOp::Ne(expected), Some(found)) => !values_equal(found, expected),
            (FilterOp::Ne(_), None) => true,
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

struct Parser<'s> {
    src: &'s str,
    original: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn error(&self, reason: impl Into<String>) -> JsonPathError {
        JsonPathError::Syntax {
            path: self.original.to_string(),
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), JsonPathError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", expected)))
        }
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn segments(&mut self) -> Result<Vec<Segment>, JsonPathError> {
        let mut segments = Vec::new();

        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.bump();
                    if self.eat('.') {
                        if self.eat('*') {
                            segments.push(Segment::DescendantWildcard);
                        } else {
                            let name = self.member_name()?;
                            segments.push(Segment::Descendant(name));
                        }
                    } else if self.eat('*') {
                        segments.push(Segment::Wildcard);
                    } else {
                        let name = self.member_name()?;
                        segments.push(Segment::Child(name));
                    }
                }
                '[' => {
                    self.bump();
                    segments.push(self.bracket()?);
                }
                _ => return Err(self.error(format!("unexpected character '{}'", c))),
            }
        }

        Ok(segments)
    }

    fn member_name(&mut self) -> Result<String, JsonPathError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '.' || c == '[' {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("empty member name"));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn bracket(&mut self) -> Result<Segment, JsonPathError> {
        self.skip_ws();
        let segment = match self.peek() {
            Some('*') => {
                self.bump();
                Segment::Wildcard
            }
            Some('\'') | Some('"') => Segment::Child(self.quoted()?),
            Some('?') => {
                self.bump();
                Segment::Filter(self.filter()?)
            }
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let start = self.pos;
                self.bump();
                while matches!(self.peek(), Some(d) if d.is_ascii_digit()) {
                    self.bump();
                }
                let idx = self.src[start..self.pos]
                    .parse::<i64>()
                    .map_err(|e| self.error(e.to_string()))?;
                Segment::Index(idx)
            }
            _ => return Err(self.error("expected '*', index, quoted name or filter")),
        };
        self.skip_ws();
        self.expect(']')?;
        Ok(segment)
    }

    fn quoted(&mut self) -> Result<String, JsonPathError> {
        let quote = self.bump().ok_or_else(|| self.error("expected quote"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn filter(&mut self) -> Result<Filter, JsonPathError> {
        self.skip_ws();
        self.expect('(')?;
        self.skip_ws();
        self.expect('@')?;

        let mut path = Vec::new();
        while self.eat('.') {
            let start = self.pos;
            while let Some(c) = self.peek() {
                if c.is_alphanumeric() || c == '_' || c == '-' || c == ':' {
                    self.bump();
                } else {
                    break;
                }
            }
            if self.pos == start {
                return Err(self.error("empty member name in filter"));
            }
            path.push(self.src[start..self.pos].to_string());
        }

        self.skip_ws();
        let op = if self.src[self.pos..].starts_with("==") {
            self.pos += 2;
            self.skip_ws();
            FilterOp::Eq(self.literal()?)
        } else if self.src[self.pos..].starts_with("!=") {
            self.pos += 2;
            self.skip_ws();
            FilterOp::Ne(self.literal()?)
        } else {
            FilterOp::Exists
        };

        self.skip_ws();
        self.expect(')')?;
        Ok(Filter { path, op })
    }

    fn literal(&mut self) -> Result<Value, JsonPathError> {
        match self.peek() {
            Some('\'') | Some('"') => Ok(Value::String(self.quoted()?)),
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == ')' || c.is_whitespace() {
                        break;
                    }
                    self.bump();
                }
                let raw = &self.src[start..self.pos];
                serde_json::from_str::<Value>(raw)
                    .map_err(|_| self.error(format!("invalid literal '{}'", raw)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!([
            {"id": "Hotel:h1", "type": "Hotel", "name": {"value": "Grand"}},
            {"id": "HotelRoom:r1", "type": "HotelRoom", "hasLocation": {"value": "Hotel:h1"}},
            {"id": "HotelRoom:r2", "type": "HotelRoom", "hasLocation": {"value": "Hotel:h1"}}
        ])
    }

    #[test]
    fn test_filter_iterator_selects_by_type() {
        let path = JsonPath::parse("$[?(@.type=='HotelRoom')]").unwrap();
        let doc = doc();
        let ids: Vec<&str> = path
            .select_values(&doc)
            .iter()
            .map(|v| v["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["HotelRoom:r1", "HotelRoom:r2"]);
    }

    #[test]
    fn test_not_equal_filter() {
        let path = JsonPath::parse("$[?(@.type != 'HotelRoom')]").unwrap();
        let doc = doc();
        assert_eq!(path.select(&doc).len(), 1);
    }

    #[test]
    fn test_nested_filter_path() {
        let path = JsonPath::parse("$[?(@.hasLocation.value=='Hotel:h1')]").unwrap();
        let doc = doc();
        assert_eq!(path.select(&doc).len(), 2);
    }

    #[test]
    fn test_relative_path_without_root() {
        let path = JsonPath::parse("airFlowSetpoint").unwrap();
        let entity = json!({"id": "v1", "airFlowSetpoint": 120});
        let matches = path.select(&entity);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].leaf_name(), Some("airFlowSetpoint"));
        assert_eq!(matches[0].value, &json!(120));
    }

    #[test]
    fn test_recursive_descent() {
        let path = JsonPath::parse("$..value").unwrap();
        let entity = json!({"a": {"value": 1}, "b": [{"value": 2}], "value": 0});
        let values: Vec<i64> = path
            .select_values(&entity)
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[test]
    fn test_wildcard_and_index() {
        let entity = json!({"refs": ["B:1", "B:2", "B:3"]});
        assert_eq!(JsonPath::parse("$.refs[*]").unwrap().select(&entity).len(), 3);
        let last = JsonPath::parse("$.refs[-1]").unwrap();
        assert_eq!(last.select_values(&entity), vec![&json!("B:3")]);
        let quoted = JsonPath::parse("$['refs'][0]").unwrap();
        assert_eq!(quoted.select_values(&entity), vec![&json!("B:1")]);
    }

    #[test]
    fn test_restricted_subset() {
        assert!(ensure_restricted("$.airFlowSetpoint").is_ok());
        assert!(ensure_restricted("$..value").is_ok());
        assert!(ensure_restricted("$.*.value").is_ok());

        let err = ensure_restricted("$[?(@.type=='X')]").unwrap_err();
        assert!(matches!(err, JsonPathError::Disallowed { operator: '?', .. }));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(JsonPath::parse("$.").is_err());
        assert!(JsonPath::parse("$[?(@.a=='x'").is_err());
        assert!(JsonPath::parse("$['unterminated]").is_err());
    }

    #[test]
    fn test_resolve_reference_flattens_lists() {
        let record = json!({"refs": ["B:1", "B:2"], "hasLocation": {"value": "R:1"}});
        let refs: Vec<String> = resolve_reference(&record, "refs")
            .into_iter()
            .filter_map(scalar_to_string)
            .collect();
        assert_eq!(refs, vec!["B:1", "B:2"]);

        let loc = resolve_reference(&record, "$.hasLocation.value");
        assert_eq!(loc, vec![&json!("R:1")]);
        assert!(resolve_reference(&record, "missing.key").is_empty());
    }

    #[test]
    fn test_resolve_reference_through_list_of_objects() {
        let record = json!({"devices": [{"ref": "D:1"}, {"ref": "D:2"}]});
        assert_eq!(resolve_reference(&record, "devices.ref").len(), 2);
    }

    #[test]
    fn test_scalar_to_string() {
        assert_eq!(scalar_to_string(&json!(42)), Some("42".to_string()));
        assert_eq!(scalar_to_string(&json!(true)), Some("true".to_string()));
        assert_eq!(scalar_to_string(&json!(null)), None);
        assert_eq!(scalar_to_string(&json!({"a": 1})), None);
    }
}
