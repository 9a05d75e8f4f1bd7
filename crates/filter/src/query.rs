//! Filter tokens typed into a search box or passed as flags.
//!
//! Syntax: `column=value` (the column kind's default operator) or
//! `column:operator=value`. Option sets are comma separated, ranges are `FROM..TO`,
//! dates are `YYYY-MM-DD`. Anything that is not a filter token is free text.

use chrono::NaiveDate;
use tabula_core::format::to_kebab_case;
use tabula_core::{ColumnRegistry, ColumnSpec, FilterKind};
use tracing::debug;

use crate::{ColumnFilter, FilterError, FilterOperand, FilterOperator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterToken {
    pub column: String,
    pub operator: Option<FilterOperator>,
    pub raw: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub filters: Vec<FilterToken>,
    /// Remaining words joined by single spaces; becomes the global filter.
    pub free_text: String,
}

/// Parse `column=value` / `column:op=value`. Returns `Ok(None)` when the input is not a
/// filter token at all (no `=`, or nothing before it).
pub fn parse_filter_token(tok: &str) -> Result<Option<FilterToken>, FilterError> {
    let Some(eq) = tok.find('=') else { return Ok(None) };
    let (key, raw) = (tok[..eq].trim(), &tok[eq + 1..]);
    if key.is_empty() { return Ok(None); }
    let (column, operator) = match key.split_once(':') {
        Some((col, op)) => {
            if col.trim().is_empty() { return Err(FilterError::Malformed(tok.to_string())); }
            (col.trim(), Some(op.parse::<FilterOperator>()?))
        }
        None => (key, None),
    };
    Ok(Some(FilterToken { column: column.to_string(), operator, raw: raw.trim().to_string() }))
}

/// Split a search-box query into typed filter tokens and free text.
/// Tokens that look like filters but fail to parse are kept as free text.
pub fn parse_query(q: &str) -> ParsedQuery {
    let mut out = ParsedQuery::default();
    let mut free_terms: Vec<&str> = Vec::new();
    for tok in q.split_whitespace() {
        match parse_filter_token(tok) {
            Ok(Some(f)) => out.filters.push(f),
            Ok(None) => free_terms.push(tok),
            Err(e) => {
                debug!(token = tok, error = %e, "treating malformed filter token as free text");
                free_terms.push(tok);
            }
        }
    }
    out.free_text = free_terms.join(" ");
    out
}

/// Parse a raw operand for an operator. Empty input yields an empty operand of the
/// right shape (callers treat it as "no filter").
pub fn parse_operand(operator: FilterOperator, raw: &str) -> Result<FilterOperand, FilterError> {
    let raw = raw.trim();
    let operand = match operator {
        FilterOperator::Contains => FilterOperand::Text(raw.to_string()),
        FilterOperator::IsAnyOf => FilterOperand::Options(
            raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect(),
        ),
        FilterOperator::Before | FilterOperator::After | FilterOperator::On => FilterOperand::Date(parse_date(raw)?),
        FilterOperator::Between => {
            let (a, b) = split_range(raw)?;
            FilterOperand::DateRange(parse_date(a)?, parse_date(b)?)
        }
        FilterOperator::Equals => FilterOperand::Number(parse_number(raw)?),
        FilterOperator::Range => {
            let (a, b) = split_range(raw)?;
            FilterOperand::NumberRange(parse_number(a)?, parse_number(b)?)
        }
    };
    Ok(operand)
}

impl FilterToken {
    /// Pick the operator (explicit or the kind's default) and parse the operand.
    pub fn resolve(&self, kind: FilterKind) -> Result<(FilterOperator, FilterOperand), FilterError> {
        let operator = self.operator.unwrap_or_else(|| FilterOperator::default_for(kind));
        if !operator.is_allowed_for(kind) {
            return Err(FilterError::OperatorNotAllowed { operator, kind });
        }
        Ok((operator, parse_operand(operator, &self.raw)?))
    }
}

/// Find a column by exact id, case-insensitive id, or kebab-cased id
/// (`created-at` finds `Created At`).
pub fn find_column<'a, T>(registry: &'a ColumnRegistry<T>, name: &str) -> Option<&'a ColumnSpec<T>> {
    if let Some(c) = registry.get(name) { return Some(c); }
    let kebab = to_kebab_case(name);
    registry
        .iter()
        .find(|c| c.id.eq_ignore_ascii_case(name) || to_kebab_case(&c.id) == kebab)
}

/// Resolve tokens against a registry into column filters (ids normalized to the
/// registry's). Tokens whose operand is empty are dropped.
pub fn resolve_filters<T>(registry: &ColumnRegistry<T>, tokens: &[FilterToken]) -> Result<Vec<ColumnFilter>, FilterError> {
    let mut out = Vec::with_capacity(tokens.len());
    for tok in tokens {
        let col = find_column(registry, &tok.column).ok_or_else(|| FilterError::UnknownColumn(tok.column.clone()))?;
        let kind = col.filter_kind().ok_or_else(|| FilterError::NotFilterable(col.id.clone()))?;
        let (operator, operand) = tok.resolve(kind)?;
        if operand.is_empty() { continue; }
        out.push(ColumnFilter::new(col.id.clone(), operator, operand));
    }
    Ok(out)
}

fn parse_date(s: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| FilterError::InvalidDate(s.to_string()))
}

fn parse_number(s: &str) -> Result<f64, FilterError> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| FilterError::InvalidNumber(s.to_string()))
}

fn split_range(s: &str) -> Result<(&str, &str), FilterError> {
    match s.split_once("..") {
        Some((a, b)) if !a.trim().is_empty() && !b.trim().is_empty() => Ok((a, b)),
        _ => Err(FilterError::InvalidRange(s.to_string())),
    }
}
