//! JSON shapes shared by the REST API and snapshot files.
//!
//! An entity is `{"pk", "tableName", "columns": [{"name", "value",
//! "displayValue"}]}`; a criterion is the advanced-search tree of
//! `{"fieldName", "operator", "value"}` leaves under `and` nodes.

use labgraph_graph::{Attribute, Criterion, KeyValue, Row};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireColumn {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "displayValue", default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEntity {
    pub pk: Value,
    #[serde(rename = "tableName")]
    pub table_name: String,
    #[serde(default)]
    pub columns: Vec<WireColumn>,
}

/// Body of an advanced-search response, and of a snapshot file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityPage {
    #[serde(default)]
    pub entities: Vec<WireEntity>,
}

impl WireEntity {
    /// Convert to a [`Row`]. `None` when the primary key is unusable.
    pub fn into_row(self) -> Option<Row> {
        let pk = KeyValue::from_json(&self.pk)?;
        let mut row = Row::new(self.table_name.as_str(), pk);
        for column in self.columns {
            let display_value = column.display_value.and_then(display_text);
            row.set(
                &column.name,
                Attribute {
                    value: column.value,
                    display_value,
                },
            );
        }
        Some(row)
    }

    pub fn from_row(row: &Row) -> Self {
        Self {
            pk: row.primary_key().to_json(),
            table_name: row.table().to_string(),
            columns: row
                .attributes()
                .map(|(name, attr)| WireColumn {
                    name: name.to_string(),
                    value: attr.value.clone(),
                    display_value: attr.display_value.clone().map(Value::from),
                })
                .collect(),
        }
    }
}

impl EntityPage {
    /// Rows of the page; entities without a usable key are dropped with a
    /// warning.
    pub fn into_rows(self) -> Vec<Row> {
        let mut rows = Vec::with_capacity(self.entities.len());
        for entity in self.entities {
            let table = entity.table_name.clone();
            let pk = entity.pk.clone();
            match entity.into_row() {
                Some(row) => rows.push(row),
                None => tracing::warn!(table = %table, pk = %pk, "dropping entity without usable primary key"),
            }
        }
        rows
    }
}

fn display_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(display_text).collect();
            (!parts.is_empty()).then(|| parts.join(";"))
        }
        _ => None,
    }
}

/// Advanced-search form of a criterion.
pub fn criterion_to_wire(criterion: &Criterion) -> Value {
    match criterion {
        Criterion::Equals { field, value } => json!({
            "fieldName": field,
            "operator": "equals",
            "value": value,
        }),
        Criterion::OneOf { field, values } => json!({
            "fieldName": field,
            "operator": "inSet",
            "value": values,
        }),
        Criterion::Between { field, min, max } => match (min, max) {
            (Some(min), Some(max)) => json!({
                "fieldName": field,
                "operator": "betweenInclusive",
                "start": min,
                "end": max,
            }),
            (Some(min), None) => json!({
                "fieldName": field,
                "operator": "greaterThanOrEqual",
                "value": min,
            }),
            (None, Some(max)) => json!({
                "fieldName": field,
                "operator": "lessThanOrEqual",
                "value": max,
            }),
            (None, None) => json!({
                "fieldName": field,
                "operator": "notNull",
            }),
        },
        Criterion::And { criteria } => json!({
            "operator": "and",
            "criteria": criteria.iter().map(criterion_to_wire).collect::<Vec<_>>(),
        }),
    }
}
