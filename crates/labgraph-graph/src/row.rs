//! Rows fetched from a record store.
//!
//! A [`Row`] is one entity of one table: a primary key plus named
//! attributes. Each attribute carries the raw stored value and, when the raw
//! value is itself a foreign key, an optional human-readable display value.
//!
//! Accessors never fail: an attribute that is missing, null or of the wrong
//! shape reads as `None`, so one malformed record cannot abort extraction of
//! the others.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Table tags
// ============================================================================

/// Source table of a row.
///
/// Parsed once when the row is built so that extraction dispatches on a tag
/// instead of re-comparing table-name strings at every visit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Table {
    Content,
    ContentType,
    ExperimentRun,
    ExperimentRunStep,
    ExperimentRunStepContent,
    ExperimentTemplate,
    Instrument,
    ReferenceDataRecord,
    Result,
    Sop,
    Test,
    Other(String),
}

impl Table {
    pub fn as_str(&self) -> &str {
        match self {
            Table::Content => "Content",
            Table::ContentType => "ContentType",
            Table::ExperimentRun => "ExperimentRun",
            Table::ExperimentRunStep => "ExperimentRunStep",
            Table::ExperimentRunStepContent => "ExperimentRunStepContent",
            Table::ExperimentTemplate => "ExperimentTemplate",
            Table::Instrument => "Instrument",
            Table::ReferenceDataRecord => "ReferenceDataRecord",
            Table::Result => "Result",
            Table::Sop => "SOP",
            Table::Test => "Test",
            Table::Other(name) => name,
        }
    }
}

impl From<&str> for Table {
    fn from(name: &str) -> Self {
        match name {
            "Content" => Table::Content,
            "ContentType" => Table::ContentType,
            "ExperimentRun" => Table::ExperimentRun,
            "ExperimentRunStep" => Table::ExperimentRunStep,
            "ExperimentRunStepContent" => Table::ExperimentRunStepContent,
            "ExperimentTemplate" => Table::ExperimentTemplate,
            "Instrument" => Table::Instrument,
            "ReferenceDataRecord" => Table::ReferenceDataRecord,
            "Result" => Table::Result,
            "SOP" => Table::Sop,
            "Test" => Table::Test,
            other => Table::Other(other.to_string()),
        }
    }
}

impl From<String> for Table {
    fn from(name: String) -> Self {
        Table::from(name.as_str())
    }
}

impl From<Table> for String {
    fn from(table: Table) -> Self {
        table.as_str().to_string()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Key values
// ============================================================================

/// A primary- or foreign-key value.
///
/// Integral numbers and strings holding a canonical integer (`"12"`, not
/// `"012"`) both normalize to [`KeyValue::Int`], so a key stored as text on
/// one table still meets the numeric primary key it points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Text(String),
}

impl KeyValue {
    /// Interpret a raw JSON scalar as a key. Lists, objects, booleans, null
    /// and non-integral numbers are not keys.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(KeyValue::Int(i))
                } else {
                    let f = n.as_f64()?;
                    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then(|| KeyValue::Int(f as i64))
                }
            }
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                Some(Self::from(s))
            }
            _ => None,
        }
    }

    /// Every key found in a raw value: the scalar itself, or each element of
    /// a list.
    pub fn all_from_json(value: &Value) -> Vec<Self> {
        match value {
            Value::Array(items) => items.iter().filter_map(Self::from_json).collect(),
            other => Self::from_json(other).into_iter().collect(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            KeyValue::Int(i) => Value::from(*i),
            KeyValue::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Int(value)
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        KeyValue::Int(i64::from(value))
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        match value.parse::<i64>() {
            Ok(i) if i.to_string() == value => KeyValue::Int(i),
            _ => KeyValue::Text(value.to_string()),
        }
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::from(value.as_str())
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(i) => write!(f, "{i}"),
            KeyValue::Text(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// Node identity
// ============================================================================

/// Identity of a row inside one traversal: `"{table}.{primary_key}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub table: Table,
    pub key: KeyValue,
}

impl NodeId {
    pub fn new(table: impl Into<Table>, key: impl Into<KeyValue>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.key)
    }
}

// ============================================================================
// Rows
// ============================================================================

/// A raw stored value plus its optional display label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
}

impl Attribute {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            display_value: None,
        }
    }

    pub fn with_display(value: impl Into<Value>, display: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display_value: Some(display.into()),
        }
    }
}

/// One fetched entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    table: Table,
    primary_key: KeyValue,
    #[serde(default)]
    attributes: BTreeMap<String, Attribute>,
}

impl Row {
    pub fn new(table: impl Into<Table>, primary_key: impl Into<KeyValue>) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute insert.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, Attribute::new(value));
        self
    }

    /// Builder-style insert of a value with a display label.
    pub fn with_display(
        mut self,
        name: &str,
        value: impl Into<Value>,
        display: impl Into<String>,
    ) -> Self {
        self.set(name, Attribute::with_display(value, display));
        self
    }

    pub fn set(&mut self, name: &str, attr: Attribute) {
        self.attributes.insert(name.to_string(), attr);
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn primary_key(&self) -> &KeyValue {
        &self.primary_key
    }

    pub fn node_id(&self) -> NodeId {
        NodeId {
            table: self.table.clone(),
            key: self.primary_key.clone(),
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Raw value; null reads as absent.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.attributes
            .get(name)
            .map(|a| &a.value)
            .filter(|v| !v.is_null())
    }

    pub fn display(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)?.display_value.as_deref()
    }

    /// Keys stored under `name`: the scalar, or every element of a list.
    pub fn keys(&self, name: &str) -> Vec<KeyValue> {
        self.value(name)
            .map(KeyValue::all_from_json)
            .unwrap_or_default()
    }

    /// Text form of a scalar value. Numbers and booleans are rendered.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.value(name)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// The display label if present, otherwise the text form of the value.
    pub fn label(&self, name: &str) -> Option<String> {
        match self.display(name) {
            Some(d) if !d.trim().is_empty() => Some(d.trim().to_string()),
            _ => self.text(name),
        }
    }

    /// Numeric value; numeric strings (`"2.5"`) are accepted.
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.value(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.value(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Timestamp stored as epoch milliseconds or as an RFC 3339 string.
    pub fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.value(name)? {
            Value::Number(n) => {
                let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
                Utc.timestamp_millis_opt(millis).single()
            }
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Every display label of a list-valued attribute; falls back to the
    /// text of each raw element when no labels are present.
    ///
    /// The store joins the labels of a list with `;`, so the display value is
    /// split only when the raw value is a list. A scalar keeps its one label
    /// intact.
    pub fn labels(&self, name: &str) -> Vec<String> {
        if let Some(display) = self.display(name).map(str::trim).filter(|d| !d.is_empty()) {
            return match self.value(name) {
                Some(Value::Array(_)) => display
                    .split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
                _ => vec![display.to_string()],
            };
        }
        match self.value(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(_) => self.text(name).into_iter().collect(),
            None => Vec::new(),
        }
    }
}
