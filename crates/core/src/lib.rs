//! Tabula core types: cell values, sort direction and the column model shared by
//! the filter library, the view engine and hosts.

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod columns;
pub mod format;

pub use columns::{
    Accessor, CellRenderer, ColumnMeta, ColumnRegistry, ColumnSpec, FacetOption, FilterKind,
    OptionTransform, PlainRenderer,
};

pub mod prelude {
    pub use super::{
        compare_values, ColumnMeta, ColumnRegistry, ColumnSpec, CoreError, FacetOption, FilterKind,
        SortDirection, Value,
    };
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("duplicate column id: {0}")]
    DuplicateColumn(String),
    #[error("empty column id")]
    EmptyColumnId,
}

/// A projected cell value. Rows are opaque to the engine; accessors map them into these.
///
/// Serialized untagged so JSON rows read naturally; RFC 3339 strings deserialize as dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self { Value::Text(s.into()) }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn as_str(&self) -> Option<&str> {
        match self { Value::Text(s) => Some(s.as_str()), _ => None }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self { Value::Number(n) => Some(*n), _ => None }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self { Value::Date(d) => Some(*d), _ => None }
    }

    /// Lowercased text used for substring matching. `Null` has none.
    pub fn search_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string().to_lowercase()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Number(_) => 1,
            Value::Text(_) => 2,
            Value::Date(_) => 3,
            Value::Null => 4,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Text(v.to_string()) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::Text(v) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Number(v) }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Number(v as f64) }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self { Value::Date(v) }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(v: Option<V>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

/// Total order over values. Text compares case-insensitively first, then raw, so the
/// order is deterministic for values differing only in case. Mixed variants fall back
/// to a fixed variant rank with `Null` last.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x
            .to_lowercase()
            .cmp(&y.to_lowercase())
            .then_with(|| x.cmp(y)),
        _ => a.rank().cmp(&b.rank()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self { SortDirection::Asc => "asc", SortDirection::Desc => "desc" }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction: {}", other)),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn text_compares_case_insensitively() {
        assert_eq!(compare_values(&Value::text("alice"), &Value::text("Bob")), Ordering::Less);
        assert_eq!(compare_values(&Value::text("Rose"), &Value::text("rose")), Ordering::Less);
    }

    #[test]
    fn numbers_and_dates_order_naturally() {
        assert_eq!(compare_values(&Value::Number(2.0), &Value::Number(10.0)), Ordering::Less);
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(compare_values(&Value::Date(b), &Value::Date(a)), Ordering::Greater);
    }

    #[test]
    fn display_drops_trailing_zero_fraction() {
        assert_eq!(Value::Number(5.0).to_string(), "5");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Null.search_text(), None);
        assert_eq!(Value::text("ROSE").search_text().as_deref(), Some("rose"));
    }

    #[test]
    fn json_values_roundtrip_untagged() {
        let v: Vec<Value> = serde_json::from_str(r#"[null, true, 3, "2024-01-02T03:04:05Z", "admin"]"#).unwrap();
        assert!(v[0].is_null());
        assert_eq!(v[1], Value::Bool(true));
        assert_eq!(v[2].as_number(), Some(3.0));
        assert!(v[3].as_date().is_some());
        assert_eq!(v[4].as_str(), Some("admin"));
    }

    #[test]
    fn sort_direction_parses() {
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }
}
