//! The predicate algebra handed to a record store.
//!
//! Four shapes cover every hop and every root query: equality,
//! set membership, an inclusive range on one field, and conjunction. The
//! engine treats a [`Criterion`] as opaque and passes it to the source
//! untouched; [`Criterion::matches`] exists for stores that evaluate
//! criteria locally.

use crate::row::{KeyValue, Row};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Criterion {
    Equals {
        field: String,
        value: Value,
    },
    OneOf {
        field: String,
        values: Vec<Value>,
    },
    /// Inclusive on both ends; a missing bound is open.
    Between {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<Value>,
    },
    And {
        criteria: Vec<Criterion>,
    },
}

impl Criterion {
    pub fn equals(field: &str, value: impl Into<Value>) -> Self {
        Criterion::Equals {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn one_of<I>(field: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        Criterion::OneOf {
            field: field.to_string(),
            values: keys.into_iter().map(|k| k.to_json()).collect(),
        }
    }

    pub fn between(field: &str, min: Option<Value>, max: Option<Value>) -> Self {
        Criterion::Between {
            field: field.to_string(),
            min,
            max,
        }
    }

    /// Range over an epoch-millisecond timestamp column. `None` when both
    /// bounds are open.
    pub fn date_range(
        field: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        if start.is_none() && end.is_none() {
            return None;
        }
        Some(Self::between(
            field,
            start.map(|t| Value::from(t.timestamp_millis())),
            end.map(|t| Value::from(t.timestamp_millis())),
        ))
    }

    /// Conjoin two criteria, flattening nested conjunctions.
    pub fn and(self, other: Criterion) -> Self {
        let mut parts = Vec::new();
        for c in [self, other] {
            match c {
                Criterion::And { criteria } => parts.extend(criteria),
                c => parts.push(c),
            }
        }
        Criterion::And { criteria: parts }
    }

    /// Evaluate against a row. List-valued attributes match when any element
    /// matches.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Criterion::Equals { field, value } => {
                candidates(row, field).iter().any(|v| values_equal(v, value))
            }
            Criterion::OneOf { field, values } => candidates(row, field)
                .iter()
                .any(|v| values.iter().any(|want| values_equal(v, want))),
            Criterion::Between { field, min, max } => candidates(row, field).iter().any(|v| {
                let lower_ok = min
                    .as_ref()
                    .map_or(true, |m| compare(v, m).is_some_and(|o| o != Ordering::Less));
                let upper_ok = max
                    .as_ref()
                    .map_or(true, |m| compare(v, m).is_some_and(|o| o != Ordering::Greater));
                lower_ok && upper_ok
            }),
            Criterion::And { criteria } => criteria.iter().all(|c| c.matches(row)),
        }
    }

    /// Fields referenced anywhere in the criterion.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Criterion::Equals { field, .. }
            | Criterion::OneOf { field, .. }
            | Criterion::Between { field, .. } => vec![field.as_str()],
            Criterion::And { criteria } => criteria.iter().flat_map(|c| c.fields()).collect(),
        }
    }
}

fn candidates<'r>(row: &'r Row, field: &str) -> Vec<Cow<'r, Value>> {
    match row.value(field) {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(Cow::Borrowed)
            .collect(),
        Some(v) => vec![Cow::Borrowed(v)],
        // The primary key is held outside the attribute map.
        None if field.ends_with("_pk") => vec![Cow::Owned(row.primary_key().to_json())],
        None => Vec::new(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (KeyValue::from_json(a), KeyValue::from_json(b)) {
        (Some(x), Some(y)) => x == y,
        _ => match (ordinal(a), ordinal(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (ordinal(a), ordinal(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (a, b) {
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            _ => None,
        },
    }
}

/// Numbers compare as numbers; RFC 3339 strings compare as epoch millis.
fn ordinal(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|t| t.timestamp_millis() as f64)
            .or_else(|| s.trim().parse::<f64>().ok()),
        _ => None,
    }
}
