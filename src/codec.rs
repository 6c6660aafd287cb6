//! Record encoding for the on-disk log format.
//!
//! Each logger instance is bound to exactly one [`DataKind`]. The codec
//! turns a [`Record`] into a single delimiter-free line and back. Decoding
//! never fails: malformed input degrades to the kind's empty value, which
//! callers filter out with [`Record::is_empty`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, UnsupportedDataKindSnafu};

/// Record delimiter used to terminate log entries and split length-mode reads.
pub const DELIMITER: u8 = b'\n';

/// The encoding used for every record handled by a logger instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// Decimal integers, one per line.
    #[default]
    #[serde(alias = "int")]
    Integer,
    /// JSON documents, one per line.
    #[serde(alias = "json")]
    Structured,
    /// Comma-separated scalar fields, one record per line.
    #[serde(alias = "csv")]
    Flat,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Integer => "integer",
            DataKind::Structured => "structured",
            DataKind::Flat => "flat",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(DataKind::Integer),
            "structured" | "json" => Ok(DataKind::Structured),
            "flat" | "csv" => Ok(DataKind::Flat),
            _ => UnsupportedDataKindSnafu { kind: s }.fail(),
        }
    }
}

/// A logical unit of data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Integer(i64),
    Structured(Value),
    Flat(Vec<String>),
}

impl Record {
    /// Whether this record counts as "nothing to log".
    ///
    /// Zero is empty for integers, so a zero id is never recorded as a
    /// success or failure.
    pub fn is_empty(&self) -> bool {
        match self {
            Record::Integer(n) => *n == 0,
            Record::Structured(value) => is_empty_value(value),
            Record::Flat(fields) => fields.is_empty(),
        }
    }

    /// Truncate this record to an integer checkpoint marker.
    pub fn as_integer(&self) -> i64 {
        match self {
            Record::Integer(n) => *n,
            Record::Structured(value) => value_as_integer(value),
            Record::Flat(fields) => fields.first().map(|f| leading_integer(f)).unwrap_or(0),
        }
    }
}

impl From<i64> for Record {
    fn from(n: i64) -> Self {
        Record::Integer(n)
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Record::Structured(value)
    }
}

impl From<Vec<String>> for Record {
    fn from(fields: Vec<String>) -> Self {
        Record::Flat(fields)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Integer(n) => write!(f, "{n}"),
            Record::Structured(value) => write!(f, "{value}"),
            Record::Flat(fields) => f.write_str(&fields.join(",")),
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn value_as_integer(value: &Value) -> i64 {
    match value {
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => leading_integer(s),
        _ => 0,
    }
}

/// Parse the leading integer of `text`, ignoring leading whitespace.
///
/// Returns 0 when no digits follow the optional sign. Out-of-range values
/// saturate.
pub fn leading_integer(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(byte - b'0');
        value = match value
            .checked_mul(10)
            .and_then(|v| if negative { v.checked_sub(digit) } else { v.checked_add(digit) })
        {
            Some(v) => v,
            None => return if negative { i64::MIN } else { i64::MAX },
        };
    }
    value
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(if *b { "1".to_string() } else { String::new() }),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Converts records to and from their on-disk text for one [`DataKind`].
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    kind: DataKind,
}

impl Codec {
    pub fn new(kind: DataKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// The empty value for this kind.
    pub fn empty(&self) -> Record {
        match self.kind {
            DataKind::Integer => Record::Integer(0),
            DataKind::Structured => Record::Structured(Value::Null),
            DataKind::Flat => Record::Flat(Vec::new()),
        }
    }

    /// Encode a record into a single line without the trailing delimiter.
    ///
    /// A record whose shape this kind cannot express encodes to `""`.
    pub fn encode(&self, record: &Record) -> String {
        let encoded = match self.kind {
            DataKind::Integer => return record.as_integer().to_string(),
            DataKind::Structured => {
                let value = match record {
                    Record::Integer(n) => Value::from(*n),
                    Record::Structured(value) => value.clone(),
                    Record::Flat(fields) => Value::from(fields.clone()),
                };
                serde_json::to_string(&value).unwrap_or_default()
            }
            DataKind::Flat => match record {
                Record::Integer(n) => n.to_string(),
                Record::Flat(fields) => fields.join(","),
                Record::Structured(Value::Array(items)) => join_scalars(items.iter()),
                Record::Structured(Value::Object(map)) => join_scalars(map.values()),
                Record::Structured(value) => scalar_text(value).unwrap_or_default(),
            },
        };
        strip_delimiter(encoded)
    }

    /// Decode one line. Never fails; malformed input yields [`Codec::empty`].
    pub fn decode(&self, bytes: &[u8]) -> Record {
        let text = String::from_utf8_lossy(bytes);
        match self.kind {
            DataKind::Integer => Record::Integer(leading_integer(&text)),
            DataKind::Structured => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return self.empty();
                }
                serde_json::from_str(trimmed)
                    .map(Record::Structured)
                    .unwrap_or_else(|_| self.empty())
            }
            DataKind::Flat => {
                let line = text.trim_end_matches('\r');
                if line.is_empty() {
                    return self.empty();
                }
                Record::Flat(line.split(',').map(str::to_string).collect())
            }
        }
    }
}

fn join_scalars<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    let mut parts = Vec::new();
    for value in values {
        match scalar_text(value) {
            Some(text) => parts.push(text),
            None => return String::new(),
        }
    }
    parts.join(",")
}

fn strip_delimiter(mut encoded: String) -> String {
    if encoded.as_bytes().contains(&DELIMITER) {
        encoded.retain(|c| c != DELIMITER as char);
    }
    encoded
}
