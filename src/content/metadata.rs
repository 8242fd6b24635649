//! Typed frontmatter values, independent of the format they were written in

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use indexmap::IndexMap;
use serde::Serialize;

/// A single frontmatter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(DateTime<FixedOffset>),
    List(Vec<MetaValue>),
    Map(IndexMap<String, MetaValue>),
}

/// Frontmatter keys mapped to typed values, in source order
pub type Metadata = IndexMap<String, MetaValue>;

impl MetaValue {
    /// Scalar values rendered as a string; `None` for lists, maps and null
    pub fn as_scalar_string(&self) -> Option<String> {
        match self {
            MetaValue::String(s) => Some(s.clone()),
            MetaValue::Bool(b) => Some(b.to_string()),
            MetaValue::Integer(i) => Some(i.to_string()),
            MetaValue::Float(f) => Some(f.to_string()),
            MetaValue::Date(d) => Some(d.to_rfc3339()),
            MetaValue::Null | MetaValue::List(_) | MetaValue::Map(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            MetaValue::Null => "null",
            MetaValue::Bool(_) => "boolean",
            MetaValue::Integer(_) => "integer",
            MetaValue::Float(_) => "float",
            MetaValue::String(_) => "string",
            MetaValue::Date(_) => "timestamp",
            MetaValue::List(_) => "sequence",
            MetaValue::Map(_) => "mapping",
        }
    }

    pub(crate) fn from_yaml(value: serde_yaml::Value) -> Result<Self, String> {
        use serde_yaml::Value;

        Ok(match value {
            Value::Null => MetaValue::Null,
            Value::Bool(b) => MetaValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => MetaValue::Integer(i),
                None => MetaValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => MetaValue::String(s),
            Value::Sequence(items) => MetaValue::List(
                items
                    .into_iter()
                    .map(MetaValue::from_yaml)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Mapping(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    let key = match k {
                        Value::String(s) => s,
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        other => return Err(format!("unsupported mapping key {:?}", other)),
                    };
                    out.insert(key, MetaValue::from_yaml(v)?);
                }
                MetaValue::Map(out)
            }
            Value::Tagged(tagged) => MetaValue::from_yaml(tagged.value)?,
        })
    }

    pub(crate) fn from_toml(value: toml::Value, tz: Tz) -> Result<Self, String> {
        use toml::Value;

        Ok(match value {
            Value::String(s) => MetaValue::String(s),
            Value::Integer(i) => MetaValue::Integer(i),
            Value::Float(f) => MetaValue::Float(f),
            Value::Boolean(b) => MetaValue::Bool(b),
            Value::Datetime(dt) => {
                let text = dt.to_string();
                match parse_timestamp(&text, tz) {
                    Some(parsed) => MetaValue::Date(parsed),
                    // Bare times such as 07:32:00 have no date part
                    None => MetaValue::String(text),
                }
            }
            Value::Array(items) => MetaValue::List(
                items
                    .into_iter()
                    .map(|v| MetaValue::from_toml(v, tz))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Table(table) => {
                let mut out = IndexMap::with_capacity(table.len());
                for (k, v) in table {
                    out.insert(k, MetaValue::from_toml(v, tz)?);
                }
                MetaValue::Map(out)
            }
        })
    }

    pub(crate) fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => MetaValue::Null,
            Value::Bool(b) => MetaValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => MetaValue::Integer(i),
                None => MetaValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => MetaValue::String(s),
            Value::Array(items) => {
                MetaValue::List(items.into_iter().map(MetaValue::from_json).collect())
            }
            Value::Object(map) => MetaValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, MetaValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Parse a frontmatter timestamp.
///
/// Values with an explicit offset keep it; date-only and local date-time
/// values are interpreted in `tz`.
pub fn parse_timestamp(s: &str, tz: Tz) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    for fmt in ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%dT%H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    let naive_formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    for fmt in naive_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return localize(naive, tz);
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return localize(date.and_hms_opt(0, 0, 0)?, tz);
        }
    }

    None
}

/// Local wall time in `tz`. A time skipped by a DST jump moves forward an
/// hour, so midnight on a spring-forward day still parses.
fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<FixedOffset>> {
    let local = match tz.from_local_datetime(&naive) {
        LocalResult::None => tz.from_local_datetime(&(naive + Duration::hours(1))),
        found => found,
    };
    local.earliest().map(|dt| dt.fixed_offset())
}
