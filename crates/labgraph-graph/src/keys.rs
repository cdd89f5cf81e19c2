//! Foreign-key collection across input rows.

use crate::row::{KeyValue, Row};
use std::collections::BTreeSet;
use std::fmt;

/// Deduplicated keys for one hop. Ordered so that the issued criterion is
/// stable for a given input.
pub type KeySet = BTreeSet<KeyValue>;

/// Where a hop reads keys from on its input rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyColumn {
    /// The row's own primary key.
    PrimaryKey,
    /// A named attribute, scalar or list-valued.
    Named(String),
}

impl KeyColumn {
    pub fn named(name: &str) -> Self {
        KeyColumn::Named(name.to_string())
    }

    pub fn keys_of(&self, row: &Row) -> Vec<KeyValue> {
        match self {
            KeyColumn::PrimaryKey => vec![row.primary_key().clone()],
            KeyColumn::Named(name) => row.keys(name),
        }
    }
}

impl From<&str> for KeyColumn {
    fn from(name: &str) -> Self {
        KeyColumn::named(name)
    }
}

impl fmt::Display for KeyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyColumn::PrimaryKey => f.write_str("<pk>"),
            KeyColumn::Named(name) => f.write_str(name),
        }
    }
}

/// Union of every key found under any of `key_columns` on any of `rows`.
///
/// List-valued columns contribute each element; null, missing and non-key
/// values are skipped.
pub fn collect_keys<'r, I>(rows: I, key_columns: &[KeyColumn]) -> KeySet
where
    I: IntoIterator<Item = &'r Row>,
{
    let mut keys = KeySet::new();
    for row in rows {
        for column in key_columns {
            keys.extend(column.keys_of(row));
        }
    }
    keys
}
