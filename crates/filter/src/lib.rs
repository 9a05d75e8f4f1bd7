//! Tabula filter predicates: operator/operand model and pure per-value tests.
//!
//! Each filter kind owns a fixed set of operators:
//!
//! | kind   | operators                     |
//! |--------|-------------------------------|
//! | text   | contains                      |
//! | option | is-any-of                     |
//! | date   | before, after, on, between    |
//! | number | equals, range                 |

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabula_core::{FilterKind, Value};

pub mod query;
pub mod suggest;

pub use query::{parse_filter_token, parse_operand, parse_query, resolve_filters, FilterToken, ParsedQuery};
pub use suggest::suggest_columns;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FilterError {
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    #[error("operator {operator} is not allowed for {kind} columns")]
    OperatorNotAllowed { operator: FilterOperator, kind: FilterKind },
    #[error("invalid date `{0}` (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("invalid range `{0}` (expected FROM..TO)")]
    InvalidRange(String),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("column {0} has no filter")]
    NotFilterable(String),
    #[error("malformed filter `{0}` (expected column=value or column:operator=value)")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterOperator {
    Contains,
    IsAnyOf,
    Before,
    After,
    On,
    Between,
    Equals,
    Range,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Contains => "contains",
            FilterOperator::IsAnyOf => "is-any-of",
            FilterOperator::Before => "before",
            FilterOperator::After => "after",
            FilterOperator::On => "on",
            FilterOperator::Between => "between",
            FilterOperator::Equals => "equals",
            FilterOperator::Range => "range",
        }
    }

    pub fn allowed_for(kind: FilterKind) -> &'static [FilterOperator] {
        match kind {
            FilterKind::Text => &[FilterOperator::Contains],
            FilterKind::Option => &[FilterOperator::IsAnyOf],
            FilterKind::Date => &[FilterOperator::Before, FilterOperator::After, FilterOperator::On, FilterOperator::Between],
            FilterKind::Number => &[FilterOperator::Equals, FilterOperator::Range],
        }
    }

    pub fn is_allowed_for(&self, kind: FilterKind) -> bool { Self::allowed_for(kind).contains(self) }

    /// Operator used when a filter names only a column and a value.
    pub fn default_for(kind: FilterKind) -> FilterOperator {
        match kind {
            FilterKind::Text => FilterOperator::Contains,
            FilterKind::Option => FilterOperator::IsAnyOf,
            FilterKind::Date => FilterOperator::On,
            FilterKind::Number => FilterOperator::Equals,
        }
    }

    /// Whether `operand` has the shape this operator evaluates.
    pub fn accepts(&self, operand: &FilterOperand) -> bool {
        use FilterOperand as O;
        use FilterOperator as Op;
        matches!(
            (self, operand),
            (Op::Contains, O::Text(_))
                | (Op::IsAnyOf, O::Options(_))
                | (Op::Before | Op::After | Op::On, O::Date(_))
                | (Op::Between, O::DateRange(_, _))
                | (Op::Equals, O::Number(_))
                | (Op::Range, O::NumberRange(_, _))
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FilterOperator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "contains" => FilterOperator::Contains,
            "is-any-of" | "in" => FilterOperator::IsAnyOf,
            "before" => FilterOperator::Before,
            "after" => FilterOperator::After,
            "on" => FilterOperator::On,
            "between" => FilterOperator::Between,
            "equals" | "eq" => FilterOperator::Equals,
            "range" => FilterOperator::Range,
            other => return Err(FilterError::UnknownOperator(other.to_string())),
        };
        Ok(op)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FilterOperand {
    Text(String),
    Options(Vec<String>),
    Date(NaiveDate),
    DateRange(NaiveDate, NaiveDate),
    Number(f64),
    NumberRange(f64, f64),
}

impl FilterOperand {
    /// Empty operands mean "no filter" and are removed rather than matching nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterOperand::Text(s) => s.trim().is_empty(),
            FilterOperand::Options(v) => v.iter().all(|s| s.is_empty()),
            _ => false,
        }
    }
}

/// One active per-column filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub column_id: String,
    pub operator: FilterOperator,
    pub operand: FilterOperand,
}

impl ColumnFilter {
    pub fn new(column_id: impl Into<String>, operator: FilterOperator, operand: FilterOperand) -> Self {
        Self { column_id: column_id.into(), operator, operand }
    }

    pub fn matches(&self, value: &Value) -> bool { evaluate(self.operator, &self.operand, value) }
}

/// Test one cell value. `Null` never satisfies an active filter, and an operand of
/// the wrong shape for the operator never matches.
pub fn evaluate(operator: FilterOperator, operand: &FilterOperand, value: &Value) -> bool {
    if value.is_null() { return false; }
    match (operator, operand) {
        (FilterOperator::Contains, FilterOperand::Text(needle)) => {
            let needle = needle.trim().to_lowercase();
            text_contains(value, &needle)
        }
        (FilterOperator::IsAnyOf, FilterOperand::Options(set)) => {
            let v = value.to_string();
            set.iter().any(|o| *o == v)
        }
        (FilterOperator::Before, FilterOperand::Date(d)) => day_of(value).map(|v| v < *d).unwrap_or(false),
        (FilterOperator::After, FilterOperand::Date(d)) => day_of(value).map(|v| v > *d).unwrap_or(false),
        (FilterOperator::On, FilterOperand::Date(d)) => day_of(value).map(|v| v == *d).unwrap_or(false),
        (FilterOperator::Between, FilterOperand::DateRange(a, b)) => {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            day_of(value).map(|v| v >= *lo && v <= *hi).unwrap_or(false)
        }
        (FilterOperator::Equals, FilterOperand::Number(n)) => value.as_number().map(|v| v == *n).unwrap_or(false),
        (FilterOperator::Range, FilterOperand::NumberRange(a, b)) => {
            let (lo, hi) = if a <= b { (*a, *b) } else { (*b, *a) };
            value.as_number().map(|v| v >= lo && v <= hi).unwrap_or(false)
        }
        _ => false,
    }
}

/// Case-insensitive substring test; `needle_lower` must already be lowercased.
pub fn text_contains(value: &Value, needle_lower: &str) -> bool {
    match value.search_text() {
        Some(hay) => hay.contains(needle_lower),
        None => false,
    }
}

fn day_of(value: &Value) -> Option<NaiveDate> { value.as_date().map(|d| d.date_naive()) }
