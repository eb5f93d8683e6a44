//! Tag parsing and per-platform tag normalization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator used when a tag field is not a JSON array literal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TagDelimiter {
    #[default]
    Comma,
    Newline,
}

impl TagDelimiter {
    fn as_char(self) -> char {
        match self {
            Self::Comma => ',',
            Self::Newline => '\n',
        }
    }
}

/// How a platform's form receives tags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TagPlacement {
    /// Typed one at a time into a tag field, each confirmed with Enter.
    KeyedEntry,
    /// `#tag` tokens typed into the description editor.
    Hashtags,
    /// Joined with a separator into a single tag field.
    FieldList,
    /// Appended to the description on its own line, space separated.
    DescriptionSuffix,
    /// The platform form has no tag input.
    Unsupported,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagPolicy {
    pub delimiter: TagDelimiter,
    pub placement: TagPlacement,
    pub max_tags: Option<usize>,
}

impl TagPolicy {
    pub const fn new(delimiter: TagDelimiter, placement: TagPlacement) -> Self {
        Self {
            delimiter,
            placement,
            max_tags: None,
        }
    }

    pub const fn with_max(mut self, max_tags: usize) -> Self {
        self.max_tags = Some(max_tags);
        self
    }

    pub fn accepts_tags(&self) -> bool {
        self.placement != TagPlacement::Unsupported
    }

    /// Parse raw node input and reduce it to what the platform accepts.
    pub fn normalize(&self, raw: &Value) -> Vec<String> {
        if !self.accepts_tags() {
            return Vec::new();
        }
        self.apply(parse_tags(raw, self.delimiter))
    }

    /// Trim, drop empties, then keep at most `max_tags` in input order.
    pub fn apply(&self, tags: Vec<String>) -> Vec<String> {
        let cleaned = tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty());

        match self.max_tags {
            Some(max) => cleaned.take(max).collect(),
            None => cleaned.collect(),
        }
    }
}

/// Parse a tag field: JSON array first, delimiter split as fallback.
pub fn parse_tags(raw: &Value, delimiter: TagDelimiter) -> Vec<String> {
    match raw {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        Value::String(text) => parse_tag_text(text, delimiter),
        other => scalar_text(other).into_iter().collect(),
    }
}

pub fn parse_tag_text(text: &str, delimiter: TagDelimiter) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text) {
        return items.iter().filter_map(scalar_text).collect();
    }

    text.split(delimiter.as_char())
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Prefix a tag with `#` unless it already carries one.
pub fn hashtag(tag: &str) -> String {
    if tag.starts_with('#') {
        tag.to_string()
    } else {
        format!("#{tag}")
    }
}

pub fn hashtag_line(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| hashtag(tag))
        .collect::<Vec<_>>()
        .join(" ")
}
