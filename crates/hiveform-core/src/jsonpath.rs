//! Minimal JSONPath used by `wait_for_upsert`
//!
//! Supported syntax is the subset kubectl-style wait conditions use:
//! optional `{...}` braces, an optional leading `$`, dotted field names,
//! `[n]` array indices and `['key']` / `["key"]` for keys containing dots.

use serde_json::Value;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
}

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    expression: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(expression: &str) -> Result<Self> {
        let error = |message: &str| CoreError::InvalidJsonPath {
            expression: expression.to_string(),
            message: message.to_string(),
        };

        let mut body = expression.trim();
        if let Some(inner) = body.strip_prefix('{') {
            body = inner.strip_suffix('}').ok_or_else(|| error("unbalanced braces"))?;
        }
        body = body.strip_prefix('$').unwrap_or(body);

        if body.is_empty() {
            return Err(error("expression selects nothing"));
        }

        let chars: Vec<char> = body.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    i += 1;
                    let start = i;
                    while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                        i += 1;
                    }
                    if start == i {
                        return Err(error("empty field name"));
                    }
                    segments.push(Segment::Field(chars[start..i].iter().collect()));
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|p| p + i)
                        .ok_or_else(|| error("unclosed '['"))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    let inner = inner.trim();

                    let quoted = inner
                        .strip_prefix('\'')
                        .and_then(|s| s.strip_suffix('\''))
                        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')));

                    match quoted {
                        Some(key) if !key.is_empty() => segments.push(Segment::Field(key.to_string())),
                        Some(_) => return Err(error("empty quoted key")),
                        None => {
                            let index = inner
                                .parse::<usize>()
                                .map_err(|_| error("array index must be a non-negative integer"))?;
                            segments.push(Segment::Index(index));
                        }
                    }
                    i = close + 1;
                }
                _ if segments.is_empty() && i == 0 => {
                    // bare leading field, e.g. "status.phase"
                    let start = i;
                    while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                        i += 1;
                    }
                    segments.push(Segment::Field(chars[start..i].iter().collect()));
                }
                c => return Err(error(&format!("unexpected character '{c}'"))),
            }
        }

        Ok(Self {
            expression: expression.to_string(),
            segments,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Resolve the path against an object; `None` when any step is missing
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match segment {
                Segment::Field(name) => current.get(name.as_str()),
                Segment::Index(index) => current.get(*index),
            })
            .filter(|v| !v.is_null())
    }

    /// Check a wait condition: presence when `expected` is `None`, otherwise
    /// equality with the value's string rendering
    pub fn matches(&self, value: &Value, expected: Option<&str>) -> bool {
        match (self.resolve(value), expected) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(found), Some(expected)) => render(found) == expected,
        }
    }
}

/// Strings compare without quotes, everything else as compact JSON
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
