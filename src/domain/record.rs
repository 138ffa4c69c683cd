//! Schema-less dataset records and the newline-delimited JSON reader.
//!
//! A [`Record`] is one line of a dataset file: a mapping from field name to a
//! loosely typed value. Nothing about the shape is enforced at read time;
//! consumers go through the typed accessors, which answer `None` for a field
//! that is absent, null, or of the wrong type.

use serde::Serialize;
use serde_json::{Map, Value};

use super::error::RecordError;

/// Borrowed view of a single field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Number(f64),
    Text(&'a str),
    Null,
    /// Booleans, arrays and nested objects: present but not usable as a scalar.
    Other,
    Absent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn field(&self, key: &str) -> FieldValue<'_> {
        match self.fields.get(key) {
            None => FieldValue::Absent,
            Some(Value::Null) => FieldValue::Null,
            Some(Value::Number(n)) => n.as_f64().map_or(FieldValue::Other, FieldValue::Number),
            Some(Value::String(s)) => FieldValue::Text(s),
            Some(_) => FieldValue::Other,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        !matches!(self.field(key), FieldValue::Absent | FieldValue::Null)
    }

    /// Finite JSON number only.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.field(key) {
            FieldValue::Number(n) if n.is_finite() => Some(n),
            _ => None,
        }
    }

    /// Finite number, also accepting numeric strings such as `"48.72"`.
    pub fn lenient_number(&self, key: &str) -> Option<f64> {
        match self.field(key) {
            FieldValue::Number(n) if n.is_finite() => Some(n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.field(key) {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Strings as-is, numbers in their shortest display form.
    pub fn display(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// First present text value among `keys`.
    pub fn first_text(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.text(k))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Parse one line into a record. Blank lines are the caller's business.
pub fn parse_line(line: &str) -> Result<Record, RecordError> {
    match serde_json::from_str::<Value>(line)? {
        Value::Object(fields) => Ok(Record::new(fields)),
        _ => Err(RecordError::NotAnObject),
    }
}

/// Non-blank lines of a file body, in on-disk order.
pub fn non_blank_lines(content: &str) -> impl Iterator<Item = &str> {
    content.lines().filter(|line| !line.trim().is_empty())
}

/// Parse every non-blank line, dropping lines that fail to parse.
///
/// Dataset files are append-only logs and may end in a partially written
/// line, so a bad line never aborts the read.
pub fn parse_records<'a, I>(lines: I) -> Vec<Record>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| (line, parse_line(line)))
        .filter_map(|(line, parsed)| match parsed {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(error = %e, len = line.len(), "skipping malformed record line");
                None
            }
        })
        .collect()
}
