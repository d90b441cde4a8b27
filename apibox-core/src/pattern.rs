//! Route pattern matching
//!
//! Patterns are slash-delimited templates made of literal segments and
//! single-segment wildcards written `{{name}}` or `{{}}`. A pattern matches a
//! path only when both have the same number of segments; there is no prefix
//! or suffix matching.
//!
//! ```
//! use apibox_core::pattern::{matches, Pattern, RoutePath};
//!
//! assert!(matches("users/{{user_id}}/profile", "users/123/profile"));
//! assert!(!matches("users/{{}}", "users/123/profile"));
//!
//! let pattern = Pattern::parse("users/{{user_id}}").unwrap();
//! let captures = pattern.captures(&RoutePath::parse("/users/42/")).unwrap();
//! assert_eq!(captures.get("user_id"), Some("42"));
//! ```

use crate::error::{ApiBoxError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Split a pattern string into segments, ignoring leading and trailing slashes.
/// Interior empty segments are kept so [`Pattern::parse`] can reject them.
fn split_segments(input: &str) -> impl Iterator<Item = &str> {
    let trimmed = input.trim_matches('/');
    trimmed.split('/').filter(move |_| !trimmed.is_empty())
}

/// Split a request path into its non-empty segments, so `a//b` is `a/b`
fn path_segments(input: &str) -> impl Iterator<Item = &str> {
    input.split('/').filter(|s| !s.is_empty())
}

/// Returns `Some(name)` when `text` is exactly `{{` + optional identifier + `}}`
fn wildcard_name(text: &str) -> Option<Option<&str>> {
    let inner = text.strip_prefix(OPEN)?.strip_suffix(CLOSE)?;
    if inner.is_empty() {
        Some(None)
    } else if is_identifier(inner) {
        Some(Some(inner))
    } else {
        None
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Match a raw pattern string against a raw path string.
///
/// Segments that are not well-formed wildcards are compared literally, so this
/// never fails. Configuration code should prefer [`Pattern::parse`], which
/// rejects malformed wildcard syntax up front.
pub fn matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = split_segments(pattern);
    let mut values = path_segments(path);

    loop {
        match (pattern_segments.next(), values.next()) {
            (None, None) => return true,
            (Some(p), Some(s)) => {
                let ok = match wildcard_name(p) {
                    Some(_) => !s.is_empty(),
                    None => p == s,
                };
                if !ok {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// An inbound request path, split into segments
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RoutePath {
    segments: Vec<String>,
}

impl RoutePath {
    /// Split a route string on `/`, dropping empty segments
    pub fn parse(input: &str) -> Self {
        RoutePath {
            segments: path_segments(input).map(str::to_string).collect(),
        }
    }

    /// Path segments in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root path
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<&str> for RoutePath {
    fn from(input: &str) -> Self {
        RoutePath::parse(input)
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// One segment matcher
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Exact string
    Literal(String),
    /// Any single non-empty segment, optionally bound to a name
    Wildcard(Option<String>),
}

impl Segment {
    fn matches(&self, value: &str) -> bool {
        match self {
            Segment::Literal(literal) => literal == value,
            Segment::Wildcard(_) => !value.is_empty(),
        }
    }
}

/// A compiled route pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse and validate a pattern.
    ///
    /// Rejects stray or unterminated braces, wildcards that do not span a whole
    /// segment, invalid or duplicate variable names, and empty interior
    /// segments (`a//b`).
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut seen = Vec::new();

        for text in split_segments(source) {
            if text.is_empty() {
                return Err(ApiBoxError::pattern(source, "empty segment"));
            }

            match wildcard_name(text) {
                Some(Some(name)) => {
                    if seen.contains(&name) {
                        return Err(ApiBoxError::pattern(
                            source,
                            format!("duplicate variable '{}'", name),
                        ));
                    }
                    seen.push(name);
                    segments.push(Segment::Wildcard(Some(name.to_string())));
                }
                Some(None) => segments.push(Segment::Wildcard(None)),
                None => {
                    check_literal(source, text)?;
                    segments.push(Segment::Literal(text.to_string()));
                }
            }
        }

        Ok(Pattern {
            source: source.to_string(),
            segments,
        })
    }

    /// Original pattern text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Compiled segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root pattern
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Names bound by the pattern's wildcards, in order
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Wildcard(Some(name)) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Number of unnamed `{{}}` wildcards
    pub fn anonymous_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Wildcard(None)))
            .count()
    }

    /// Whether the path matches this pattern
    pub fn matches(&self, path: &RoutePath) -> bool {
        self.segments.len() == path.segments.len()
            && self
                .segments
                .iter()
                .zip(&path.segments)
                .all(|(segment, value)| segment.matches(value))
    }

    /// Match and return the values bound by each wildcard
    pub fn captures(&self, path: &RoutePath) -> Option<Captures> {
        if !self.matches(path) {
            return None;
        }

        let mut captures = Captures::default();
        for (segment, value) in self.segments.iter().zip(&path.segments) {
            match segment {
                Segment::Wildcard(Some(name)) => {
                    captures.named.insert(name.clone(), value.clone());
                }
                Segment::Wildcard(None) => captures.anonymous.push(value.clone()),
                Segment::Literal(_) => {}
            }
        }
        Some(captures)
    }

    /// Fill this pattern's wildcards from `captures`.
    ///
    /// Named wildcards take the value captured under the same name; unnamed
    /// ones consume anonymous captures left to right. Returns `None` if a
    /// value is missing.
    pub fn render(&self, captures: &Captures) -> Option<String> {
        let mut anonymous = captures.anonymous.iter();
        let mut rendered = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            let value = match segment {
                Segment::Literal(literal) => literal.as_str(),
                Segment::Wildcard(Some(name)) => captures.get(name)?,
                Segment::Wildcard(None) => anonymous.next()?.as_str(),
            };
            rendered.push(value);
        }

        Some(rendered.join("/"))
    }
}

fn check_literal(source: &str, text: &str) -> Result<()> {
    match (text.find(OPEN), text.find(CLOSE)) {
        (None, None) => Ok(()),
        (Some(_), None) => Err(ApiBoxError::pattern(source, "unterminated '{{'")),
        (None, Some(_)) => Err(ApiBoxError::pattern(source, "unmatched '}}'")),
        (Some(open), Some(close)) if open == 0 && close + CLOSE.len() == text.len() => Err(
            ApiBoxError::pattern(source, format!("invalid variable name in '{}'", text)),
        ),
        _ => Err(ApiBoxError::pattern(
            source,
            format!("wildcard must span the whole segment: '{}'", text),
        )),
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Pattern {
    type Err = ApiBoxError;

    fn from_str(s: &str) -> Result<Self> {
        Pattern::parse(s)
    }
}

/// Values bound by a pattern's wildcards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Captures {
    /// Values of `{{name}}` wildcards
    pub named: BTreeMap<String, String>,
    /// Values of `{{}}` wildcards, left to right
    pub anonymous: Vec<String>,
}

impl Captures {
    /// Value captured under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }
}

/// Parse a list of pattern strings
pub fn parse_patterns<S: AsRef<str>>(sources: &[S]) -> Result<Vec<Pattern>> {
    sources.iter().map(|s| Pattern::parse(s.as_ref())).collect()
}

/// First pattern in `patterns` that matches `path`
pub fn first_match<'a>(patterns: &'a [Pattern], path: &RoutePath) -> Option<&'a Pattern> {
    patterns.iter().find(|p| p.matches(path))
}
