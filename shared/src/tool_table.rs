//! Tool table line format
//!
//! One tool per line, fields in a fixed order, each rendered as key letter
//! followed by its value and a space. The comment comes last and runs to the
//! end of the line:
//! ```text
//! T1 P1 X0.5 Z12.25 D6 ;3mm flat end mill
//! ```
//! Comments are lower-cased on read so that tool descriptions compare
//! case-insensitively.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Tool table field keys, declared in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolKey {
    T,
    P,
    X,
    Y,
    Z,
    A,
    B,
    C,
    U,
    V,
    W,
    D,
    I,
    J,
    Q,
    Comment,
}

impl ToolKey {
    pub const ALL: [ToolKey; 16] = [
        ToolKey::T,
        ToolKey::P,
        ToolKey::X,
        ToolKey::Y,
        ToolKey::Z,
        ToolKey::A,
        ToolKey::B,
        ToolKey::C,
        ToolKey::U,
        ToolKey::V,
        ToolKey::W,
        ToolKey::D,
        ToolKey::I,
        ToolKey::J,
        ToolKey::Q,
        ToolKey::Comment,
    ];

    pub fn symbol(self) -> char {
        match self {
            ToolKey::T => 'T',
            ToolKey::P => 'P',
            ToolKey::X => 'X',
            ToolKey::Y => 'Y',
            ToolKey::Z => 'Z',
            ToolKey::A => 'A',
            ToolKey::B => 'B',
            ToolKey::C => 'C',
            ToolKey::U => 'U',
            ToolKey::V => 'V',
            ToolKey::W => 'W',
            ToolKey::D => 'D',
            ToolKey::I => 'I',
            ToolKey::J => 'J',
            ToolKey::Q => 'Q',
            ToolKey::Comment => ';',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        let symbol = symbol.to_ascii_uppercase();
        ToolKey::ALL.into_iter().find(|k| k.symbol() == symbol)
    }
}

impl fmt::Display for ToolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One tool table row. Absent fields are simply not present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolRecord {
    values: BTreeMap<ToolKey, String>,
}

impl ToolRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter; empty values leave the field absent
    pub fn with(mut self, key: ToolKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: ToolKey, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    pub fn get(&self, key: ToolKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn comment(&self) -> Option<&str> {
        self.get(ToolKey::Comment)
    }

    /// The "T" field as an integer, if present and numeric
    pub fn tool_number(&self) -> Option<i64> {
        self.get(ToolKey::T).and_then(|t| t.parse().ok())
    }

    /// First field whose value would not survive a write to the table file.
    ///
    /// No value may span lines. Field values other than the comment must also
    /// be a single token without `;`.
    pub fn malformed_field(&self) -> Option<ToolKey> {
        self.fields()
            .find(|(key, value)| {
                let breaks_line = value.contains(['\n', '\r']);
                match key {
                    ToolKey::Comment => breaks_line,
                    _ => breaks_line || value.contains(';') || value.contains(char::is_whitespace),
                }
            })
            .map(|(key, _)| key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Present fields in file order
    pub fn fields(&self) -> impl Iterator<Item = (ToolKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Parse one table line. Unknown tokens and empty values are skipped.
pub fn parse_line(line: &str) -> ToolRecord {
    let mut record = ToolRecord::new();

    let (body, comment) = match line.find(';') {
        Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
        None => (line, None),
    };

    for token in body.split_whitespace() {
        let mut chars = token.chars();
        let key = match chars.next().and_then(ToolKey::from_symbol) {
            Some(ToolKey::Comment) | None => continue,
            Some(key) => key,
        };
        let value = chars.as_str();
        if !value.is_empty() && record.get(key).is_none() {
            record.set(key, value);
        }
    }

    if let Some(comment) = comment {
        record.set(ToolKey::Comment, comment.trim_end().to_lowercase());
    }

    record
}

/// Render a record as a table line (without the line terminator)
pub fn format_line(record: &ToolRecord) -> String {
    let mut line = String::new();
    for (key, value) in record.fields() {
        match key {
            ToolKey::Comment => {
                line.push(';');
                line.push_str(value);
            }
            _ => {
                line.push(key.symbol());
                line.push_str(value);
                line.push(' ');
            }
        }
    }
    line
}

impl Serialize for ToolRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in &self.values {
            map.serialize_entry(&key.symbol().to_string(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ToolRecord {
    /// Accepts `{"T": 5, "P": "10", ";": "note"}`; numbers are kept in their textual form
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut record = ToolRecord::new();

        for (name, value) in raw {
            let mut chars = name.chars();
            let key = match (chars.next().and_then(ToolKey::from_symbol), chars.next()) {
                (Some(key), None) => key,
                _ => continue,
            };

            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(de::Error::custom(format!(
                        "invalid value for tool field '{}'",
                        key
                    )))
                }
            };
            record.set(key, text);
        }

        Ok(record)
    }
}
