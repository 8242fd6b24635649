//! Front-matter parsing
//!
//! A document may open with a metadata block in one of three formats:
//!
//! - YAML between `---` lines
//! - TOML between `+++` lines
//! - a JSON object starting at the first `{`
//!
//! Anything else means the document has no metadata and the whole text is
//! the Markdown body.

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use thiserror::Error;

use super::metadata::{parse_timestamp, MetaValue, Metadata};

/// Metadata block format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    pub fn name(&self) -> &'static str {
        match self {
            Format::Yaml => "YAML",
            Format::Toml => "TOML",
            Format::Json => "JSON",
        }
    }
}

/// Errors raised while reading a document's metadata block
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("metadata block opened with `{marker}` is never closed")]
    Unterminated { marker: &'static str },

    #[error("invalid {format} front-matter: {message}")]
    Syntax {
        format: &'static str,
        message: String,
    },

    #[error("front-matter must be a mapping of keys to values")]
    NotAMapping,

    #[error("invalid date for `{key}`: {value:?}")]
    InvalidDate { key: String, value: String },

    #[error("invalid type for `{key}`: expected {expected}, found {found}")]
    InvalidType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Split raw document text into its metadata block and body.
///
/// Returns `None` for the block when the document has no front-matter.
pub fn split(content: &str) -> Result<(Option<(Format, &str)>, &str), ParseError> {
    let content = content.trim_start_matches('\u{feff}');
    let content = content.trim_start_matches(['\n', '\r']);
    let first_line = content.lines().next().unwrap_or("").trim_end();

    if first_line == "---" {
        let (block, body) = split_delimited(content, "---")?;
        return Ok((Some((Format::Yaml, block)), body));
    }

    if first_line == "+++" {
        let (block, body) = split_delimited(content, "+++")?;
        return Ok((Some((Format::Toml, block)), body));
    }

    if content.starts_with('{') {
        let end = matching_brace(content).ok_or(ParseError::Unterminated { marker: "{" })?;
        let body = content[end..].trim_start_matches([' ', '\t', '\n', '\r']);
        return Ok((Some((Format::Json, &content[..end])), body));
    }

    Ok((None, content))
}

/// Find the block between an opening marker line and the next line that is
/// exactly the same marker.
fn split_delimited<'a>(
    content: &'a str,
    marker: &'static str,
) -> Result<(&'a str, &'a str), ParseError> {
    let after_open = content
        .find('\n')
        .map(|i| i + 1)
        .ok_or(ParseError::Unterminated { marker })?;
    let rest = &content[after_open..];

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == marker {
            let block = &rest[..offset];
            let body = rest[offset + line.len()..].trim_start_matches(['\n', '\r']);
            return Ok((block, body));
        }
        offset += line.len();
    }

    Err(ParseError::Unterminated { marker })
}

/// Byte offset just past the brace closing the object that opens `content`.
fn matching_brace(content: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in content.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a metadata block into a key/value map
pub fn parse_block(format: Format, block: &str, tz: Tz) -> Result<Metadata, ParseError> {
    let syntax = |message: String| ParseError::Syntax {
        format: format.name(),
        message,
    };

    let value = match format {
        Format::Yaml => {
            if block.trim().is_empty() {
                return Ok(Metadata::new());
            }
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(block).map_err(|e| syntax(e.to_string()))?;
            MetaValue::from_yaml(yaml).map_err(syntax)?
        }
        Format::Toml => {
            let table: toml::Table = toml::from_str(block).map_err(|e| syntax(e.to_string()))?;
            MetaValue::from_toml(toml::Value::Table(table), tz).map_err(syntax)?
        }
        Format::Json => {
            let json: serde_json::Value =
                serde_json::from_str(block).map_err(|e| syntax(e.to_string()))?;
            MetaValue::from_json(json)
        }
    };

    match value {
        MetaValue::Map(map) => Ok(map),
        MetaValue::Null => Ok(Metadata::new()),
        _ => Err(ParseError::NotAMapping),
    }
}

/// Front-matter data from a document, with the known keys typed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<DateTime<FixedOffset>>,
    pub lastmod: Option<DateTime<FixedOffset>>,
    pub publish_date: Option<DateTime<FixedOffset>>,
    pub draft: bool,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub layout: Option<String>,
    pub weight: i64,

    /// Every key that is not one of the fields above
    pub params: Metadata,
}

impl FrontMatter {
    /// Parse front-matter from content string.
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str, tz: Tz) -> Result<(Self, &str), ParseError> {
        let (block, body) = split(content)?;
        let fm = match block {
            Some((format, block)) => Self::from_metadata(parse_block(format, block, tz)?, tz)?,
            None => FrontMatter::default(),
        };
        Ok((fm, body))
    }

    /// Type the known keys of a parsed metadata map. Keys match
    /// case-insensitively.
    pub fn from_metadata(metadata: Metadata, tz: Tz) -> Result<Self, ParseError> {
        let mut fm = FrontMatter::default();

        for (key, value) in metadata {
            match key.to_ascii_lowercase().as_str() {
                "title" => fm.title = string_value(&key, value)?,
                "author" => fm.author = string_value(&key, value)?,
                "description" => fm.description = string_value(&key, value)?,
                "slug" => fm.slug = string_value(&key, value)?,
                "url" => fm.url = string_value(&key, value)?,
                "summary" => fm.summary = string_value(&key, value)?,
                "layout" => fm.layout = string_value(&key, value)?,
                "date" => fm.date = date_value(&key, value, tz)?,
                "lastmod" => fm.lastmod = date_value(&key, value, tz)?,
                "publishdate" => fm.publish_date = date_value(&key, value, tz)?,
                "draft" => fm.draft = bool_value(&key, value)?,
                "weight" => fm.weight = int_value(&key, value)?,
                "tags" => fm.tags = string_list(&key, value)?,
                "categories" => fm.categories = string_list(&key, value)?,
                _ => {
                    fm.params.insert(key, value);
                }
            }
        }

        Ok(fm)
    }

    /// Terms for a taxonomy by its plural name
    pub fn terms(&self, taxonomy: &str) -> Result<Vec<String>, ParseError> {
        match taxonomy {
            "tags" => Ok(self.tags.clone()),
            "categories" => Ok(self.categories.clone()),
            other => {
                let value = self
                    .params
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(other))
                    .map(|(_, v)| v.clone());
                match value {
                    Some(v) => string_list(other, v),
                    None => Ok(Vec::new()),
                }
            }
        }
    }
}

fn invalid_type(key: &str, expected: &'static str, found: &MetaValue) -> ParseError {
    ParseError::InvalidType {
        key: key.to_string(),
        expected,
        found: found.type_name(),
    }
}

fn string_value(key: &str, value: MetaValue) -> Result<Option<String>, ParseError> {
    match value {
        MetaValue::Null => Ok(None),
        other => other
            .as_scalar_string()
            .map(Some)
            .ok_or_else(|| invalid_type(key, "string", &other)),
    }
}

fn bool_value(key: &str, value: MetaValue) -> Result<bool, ParseError> {
    match value {
        MetaValue::Bool(b) => Ok(b),
        MetaValue::Null => Ok(false),
        MetaValue::String(ref s) if s.eq_ignore_ascii_case("true") => Ok(true),
        MetaValue::String(ref s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(invalid_type(key, "boolean", &other)),
    }
}

fn int_value(key: &str, value: MetaValue) -> Result<i64, ParseError> {
    match value {
        MetaValue::Integer(i) => Ok(i),
        MetaValue::Null => Ok(0),
        MetaValue::String(ref s) => s
            .trim()
            .parse()
            .map_err(|_| invalid_type(key, "integer", &value)),
        other => Err(invalid_type(key, "integer", &other)),
    }
}

fn date_value(
    key: &str,
    value: MetaValue,
    tz: Tz,
) -> Result<Option<DateTime<FixedOffset>>, ParseError> {
    match value {
        MetaValue::Date(d) => Ok(Some(d)),
        MetaValue::Null => Ok(None),
        MetaValue::String(s) => match parse_timestamp(&s, tz) {
            Some(d) => Ok(Some(d)),
            None => Err(ParseError::InvalidDate {
                key: key.to_string(),
                value: s,
            }),
        },
        other => Err(invalid_type(key, "timestamp", &other)),
    }
}

/// A sequence of scalars, or a single scalar as a one-element sequence.
/// Blank entries are dropped and duplicates keep their first position.
fn string_list(key: &str, value: MetaValue) -> Result<Vec<String>, ParseError> {
    let items = match value {
        MetaValue::Null => return Ok(Vec::new()),
        MetaValue::List(items) => items,
        scalar => vec![scalar],
    };

    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let s = item
            .as_scalar_string()
            .ok_or_else(|| invalid_type(key, "sequence of strings", &item))?;
        let s = s.trim().to_string();
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    }
    Ok(out)
}
