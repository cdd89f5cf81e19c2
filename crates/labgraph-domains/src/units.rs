//! Lenient readers for values stored with units attached.
//!
//! Free-text custom fields hold things like `"1.2e13 GC/ml"`, `"0.5 mL"` or
//! `"25g"`. Only the leading number matters to the views; anything that does
//! not start with one reads as absent.

use labgraph_graph::Row;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Optional sign, digits with an optional fraction (or a bare fraction), and
/// an exponent only when digits follow it.
const LEADING_NUMBER: &str = r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)";
const LIST_SEPARATOR: &str = r"\s*[;,]\s*";

static LEADING_NUMBER_RE: OnceLock<Option<Regex>> = OnceLock::new();
static LIST_SEPARATOR_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Leading decimal number of `text`, exponent included.
pub fn leading_number(text: &str) -> Option<f64> {
    let captures = compiled(&LEADING_NUMBER_RE, LEADING_NUMBER)?.captures(text)?;
    captures.get(1)?.as_str().parse::<f64>().ok()
}

/// Numeric reading of an attribute that may be a number or a unit string.
pub fn quantity(row: &Row, name: &str) -> Option<f64> {
    match row.value(name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let parsed = leading_number(s);
            if parsed.is_none() {
                tracing::debug!(
                    table = %row.table(),
                    pk = %row.primary_key(),
                    attribute = name,
                    value = %s,
                    "unparseable quantity"
                );
            }
            parsed
        }
        _ => None,
    }
}

/// Every number in a list-valued or separator-delimited attribute
/// (`[488, 561]`, `"488; 561"`, `"488,561 nm"`).
pub fn quantities(row: &Row, name: &str) -> Vec<f64> {
    match row.value(name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => leading_number(s),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => match compiled(&LIST_SEPARATOR_RE, LIST_SEPARATOR) {
            Some(separator) => separator.split(s).filter_map(leading_number).collect(),
            None => leading_number(s).into_iter().collect(),
        },
        Some(Value::Number(n)) => n.as_f64().into_iter().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leading_number_forms() {
        assert_eq!(leading_number("1.2e13 GC/ml"), Some(1.2e13));
        assert_eq!(leading_number(" 0.5 mL"), Some(0.5));
        assert_eq!(leading_number("25g"), Some(25.0));
        assert_eq!(leading_number(".75"), Some(0.75));
        assert_eq!(leading_number("-3"), Some(-3.0));
        assert_eq!(leading_number("2e"), Some(2.0));
        assert_eq!(leading_number("n/a"), None);
        assert_eq!(leading_number("."), None);
        assert_eq!(leading_number(""), None);
        assert_eq!(leading_number("+4.e2 units"), Some(400.0));
        assert_eq!(leading_number("approx. 5"), None);
    }

    #[test]
    fn test_quantity_accepts_numbers_and_unit_strings() {
        let row = Row::new("Content", 1)
            .with("volume", "0.2 uL")
            .with("mass", 1.5)
            .with("junk", "unknown");
        assert_eq!(quantity(&row, "volume"), Some(0.2));
        assert_eq!(quantity(&row, "mass"), Some(1.5));
        assert_eq!(quantity(&row, "junk"), None);
        assert_eq!(quantity(&row, "missing"), None);
    }

    #[test]
    fn test_quantities_split_lists_and_text() {
        let row = Row::new("Result", 1)
            .with("a", json!([488, "561 nm", null]))
            .with("b", "488; 561,639 nm");
        assert_eq!(quantities(&row, "a"), vec![488.0, 561.0]);
        assert_eq!(quantities(&row, "b"), vec![488.0, 561.0, 639.0]);
    }
}
