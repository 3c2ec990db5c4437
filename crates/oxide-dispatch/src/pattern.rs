//! Route pattern compilation and matching.

use std::collections::HashMap;

use regex::Regex;
use serde::Serialize;

use crate::error::{Result, RouterError};

/// Input accepted by the pattern compiler.
#[derive(Debug, Clone)]
pub enum PatternSource {
    /// A path specification such as `/users/:id/*`.
    Spec(String),
    /// A pre-built regular expression, used with its own group semantics.
    Raw(Regex),
}

impl From<&str> for PatternSource {
    fn from(spec: &str) -> Self {
        Self::Spec(spec.to_string())
    }
}

impl From<String> for PatternSource {
    fn from(spec: String) -> Self {
        Self::Spec(spec)
    }
}

impl From<Regex> for PatternSource {
    fn from(regex: Regex) -> Self {
        Self::Raw(regex)
    }
}

/// A token of a compiled path specification.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Literal text, matched exactly.
    Literal(String),
    /// `*`: one segment's worth of content.
    Wildcard,
    /// `**`: one or more segments.
    Glob,
    /// `:name`: a named single segment.
    Param(String),
    /// `::name`: the named remainder.
    Rest(String),
}

/// Values captured by a successful match.
///
/// Patterns without any named group expose their groups positionally.
/// As soon as one named group exists, only named groups are exposed.
///
/// Serializes to a JSON array or object respectively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Captures {
    /// Anonymous groups, in pattern order.
    Positional(Vec<String>),
    /// Named groups.
    Named(HashMap<String, String>),
}

impl Default for Captures {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

impl Captures {
    /// Gets a named capture.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            Self::Named(map) => map.get(name).map(String::as_str),
            Self::Positional(_) => None,
        }
    }

    /// Gets a positional capture.
    pub fn at(&self, index: usize) -> Option<&str> {
        match self {
            Self::Positional(values) => values.get(index).map(String::as_str),
            Self::Named(_) => None,
        }
    }

    /// Parses a named capture as a specific type.
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| v.parse().ok())
    }

    /// Returns the number of exposed captures.
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Named(map) => map.len(),
        }
    }

    /// Returns `true` if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the captures are keyed by name.
    pub const fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }
}

/// Outcome of matching a path against a [`RoutePattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Number of bytes of the path consumed by the match.
    pub consumed: usize,
    /// Captured values.
    pub captures: Captures,
}

/// A compiled route pattern.
///
/// Matching is anchored at the start of the path. Unless the pattern is
/// end-anchored, it only needs to match a prefix, so the remainder can be
/// handed to a nested controller.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    /// Original specification or raw regex source.
    source: String,
    /// Parsed tokens; `None` for raw patterns.
    tokens: Option<Vec<Token>>,
    /// Whether the whole remaining path must be consumed.
    anchored: bool,
    /// Compiled matcher.
    regex: Regex,
    /// Named groups in pattern order.
    names: Vec<String>,
}

impl RoutePattern {
    /// Compiles a pattern from either a path specification or a raw regex.
    ///
    /// Specification syntax:
    /// - `/users` - literal text
    /// - `*` - one segment, greedy (shortest match when `lazy` is set)
    /// - `**` - one or more segments, always greedy
    /// - `:name` - a named segment
    /// - `::name` - the named remainder of the path
    /// - a trailing `$` requires the pattern to consume the whole path
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_dispatch::RoutePattern;
    ///
    /// let pattern = RoutePattern::compile("/anon/*/**", false).unwrap();
    /// let matched = pattern.match_path("/anon/jeff/has/crabs").unwrap();
    /// assert_eq!(matched.captures.at(0), Some("jeff"));
    /// assert_eq!(matched.captures.at(1), Some("has/crabs"));
    /// ```
    pub fn compile(source: impl Into<PatternSource>, lazy: bool) -> Result<Self> {
        match source.into() {
            PatternSource::Spec(spec) => Self::parse(&spec, lazy),
            PatternSource::Raw(regex) => Ok(Self::from_regex(regex)),
        }
    }

    fn parse(spec: &str, lazy: bool) -> Result<Self> {
        let (body, anchored) = spec
            .strip_suffix('$')
            .map_or((spec, false), |body| (body, true));

        let tokens = tokenize(body);
        let mut regex_str = String::from("^");

        for token in &tokens {
            match token {
                Token::Literal(text) => regex_str.push_str(&regex::escape(text)),
                Token::Wildcard if lazy => regex_str.push_str("([^/]+?)"),
                Token::Wildcard => regex_str.push_str("([^/]+)"),
                Token::Glob => regex_str.push_str("(.+)"),
                Token::Param(name) | Token::Rest(name) if !name.is_ascii() => {
                    return Err(RouterError::InvalidPattern(format!(
                        "{spec}: capture name `{name}` must be ASCII"
                    )));
                }
                Token::Param(name) => {
                    regex_str.push_str(&format!("(?P<{name}>[^/]+)"));
                }
                Token::Rest(name) => regex_str.push_str(&format!("(?P<{name}>.+)")),
            }
        }

        if anchored {
            regex_str.push('$');
        }

        let regex = Regex::new(&regex_str)
            .map_err(|e| RouterError::InvalidPattern(format!("{spec}: {e}")))?;

        Ok(Self {
            source: spec.to_string(),
            tokens: Some(tokens),
            anchored,
            names: group_names(&regex),
            regex,
        })
    }

    fn from_regex(regex: Regex) -> Self {
        Self {
            source: regex.as_str().to_string(),
            tokens: None,
            anchored: false,
            names: group_names(&regex),
            regex,
        }
    }

    /// Attempts to match the start of `path`.
    pub fn match_path(&self, path: &str) -> Option<PatternMatch> {
        let caps = self.regex.captures(path)?;
        let whole = caps.get(0)?;

        // Raw patterns are not necessarily `^`-anchored. Leftmost-first
        // search returns a match at offset 0 whenever one exists.
        if whole.start() != 0 {
            return None;
        }

        Some(PatternMatch {
            consumed: whole.end(),
            captures: self.collect(&caps),
        })
    }

    fn collect(&self, caps: &regex::Captures<'_>) -> Captures {
        if self.names.is_empty() {
            let values = caps
                .iter()
                .skip(1)
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect();
            return Captures::Positional(values);
        }

        let named = self
            .names
            .iter()
            .filter_map(|name| caps.name(name).map(|m| (name.clone(), m.as_str().to_string())))
            .collect();
        Captures::Named(named)
    }

    /// Returns the original specification or regex source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns `true` if the pattern must consume the whole path.
    pub const fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Returns the names of the named groups.
    pub fn capture_names(&self) -> &[String] {
        &self.names
    }

    /// Builds a path from capture values.
    ///
    /// Named tokens are filled from `named`, anonymous wildcards from
    /// `positional` in order. Raw patterns cannot be reversed.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use oxide_dispatch::RoutePattern;
    ///
    /// let pattern = RoutePattern::compile("/posts/:id$", false).unwrap();
    /// let named: HashMap<String, String> =
    ///     [("id".to_string(), "123".to_string())].into_iter().collect();
    /// assert_eq!(pattern.reverse(&named, &[]), Some("/posts/123".to_string()));
    /// ```
    pub fn reverse(&self, named: &HashMap<String, String>, positional: &[&str]) -> Option<String> {
        let tokens = self.tokens.as_ref()?;
        let mut anonymous = positional.iter();
        let mut path = String::new();

        for token in tokens {
            match token {
                Token::Literal(text) => path.push_str(text),
                Token::Wildcard | Token::Glob => path.push_str(anonymous.next()?),
                Token::Param(name) | Token::Rest(name) => path.push_str(named.get(name)?),
            }
        }

        Some(path)
    }
}

fn group_names(regex: &Regex) -> Vec<String> {
    regex
        .capture_names()
        .flatten()
        .map(str::to_string)
        .collect()
}

/// Splits a specification into tokens, left to right.
fn tokenize(spec: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = spec;

    while let Some(c) = rest.chars().next() {
        let token = if let Some(tail) = rest.strip_prefix("**") {
            rest = tail;
            Some(Token::Glob)
        } else if let Some(tail) = rest.strip_prefix('*') {
            rest = tail;
            Some(Token::Wildcard)
        } else if let Some((name, tail)) = rest.strip_prefix("::").and_then(identifier) {
            rest = tail;
            Some(Token::Rest(name.to_string()))
        } else if let Some((name, tail)) = rest.strip_prefix(':').and_then(identifier) {
            rest = tail;
            Some(Token::Param(name.to_string()))
        } else {
            literal.push(c);
            rest = &rest[c.len_utf8()..];
            None
        };

        if let Some(token) = token {
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(token);
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    tokens
}

/// Splits a leading identifier off `s`, if there is one.
///
/// Any alphanumeric character counts, so a non-ASCII name is kept whole
/// and rejected when compiling instead of being cut short.
fn identifier(s: &str) -> Option<(&str, &str)> {
    let end = s
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    (end > 0).then(|| s.split_at(end))
}
