//! Pure derivation of the visible page from view state + rows + columns.
//!
//! Order is fixed: column filters (AND), global filter (OR across searchable
//! columns), stable sort, pagination slice.

use std::cmp::Ordering;
use std::mem::{self, Discriminant};
use std::time::Instant;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tabula_core::{compare_values, ColumnRegistry, ColumnSpec, FacetOption, FilterKind, SortDirection, Value};
use tabula_filter::{text_contains, ColumnFilter};
use tracing::debug;

use crate::state::ViewState;

/// A row on the current page with its position in the caller's input.
#[derive(Debug)]
pub struct PageRow<'a, T> {
    pub index: usize,
    pub row: &'a T,
}

impl<T> Clone for PageRow<'_, T> {
    fn clone(&self) -> Self { *self }
}

impl<T> Copy for PageRow<'_, T> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    /// Effective (clamped) page index.
    pub page_index: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub filtered_rows: usize,
    pub total_rows: usize,
}

impl PageInfo {
    pub fn can_previous(&self) -> bool { self.page_index > 0 }
    pub fn can_next(&self) -> bool { self.page_index + 1 < self.page_count }

    /// "Page 1 of 0" for an empty table.
    pub fn label(&self) -> String { format!("Page {} of {}", self.page_index + 1, self.page_count) }
}

#[derive(Debug)]
pub struct Page<'a, T> {
    pub rows: Vec<PageRow<'a, T>>,
    pub info: PageInfo,
}

impl<'a, T> Page<'a, T> {
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
    pub fn indices(&self) -> Vec<usize> { self.rows.iter().map(|r| r.index).collect() }
    pub fn iter(&self) -> impl Iterator<Item = &'a T> + '_ { self.rows.iter().map(|r| r.row) }
}

/// One distinct option value with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetValue {
    #[serde(flatten)]
    pub option: FacetOption,
    pub count: usize,
}

pub fn page_count(filtered: usize, page_size: usize) -> usize {
    if page_size == 0 { return 0; }
    filtered.div_ceil(page_size)
}

/// Clamp into `[0, page_count - 1]`, floor 0.
pub fn clamp_page_index(index: usize, page_count: usize) -> usize { index.min(page_count.saturating_sub(1)) }

/// Indices of rows passing every column filter and the global filter, in input order.
pub fn filtered_indices<T>(state: &ViewState, rows: &[T], columns: &ColumnRegistry<T>) -> Vec<usize> {
    filtered_indices_except(state, rows, columns, None)
}

/// Same as `filtered_indices`, optionally ignoring one column's own filter.
pub fn filtered_indices_except<T>(
    state: &ViewState,
    rows: &[T],
    columns: &ColumnRegistry<T>,
    skip_column: Option<&str>,
) -> Vec<usize> {
    let active: Vec<(&ColumnSpec<T>, &ColumnFilter)> = state
        .column_filters
        .iter()
        .filter(|f| Some(f.column_id.as_str()) != skip_column && !f.operand.is_empty())
        .filter_map(|f| columns.get(&f.column_id).map(|c| (c, f)))
        .collect();
    let term = state.global_filter.to_lowercase();
    let searchable: Vec<&ColumnSpec<T>> = if term.is_empty() { Vec::new() } else { columns.searchable().collect() };

    let mut out = Vec::with_capacity(rows.len());
    'row: for (i, row) in rows.iter().enumerate() {
        for (col, f) in active.iter() {
            if !f.matches(&col.value(row)) { continue 'row; }
        }
        if !term.is_empty() && !searchable.iter().any(|c| text_contains(&c.value(row), &term)) {
            continue 'row;
        }
        out.push(i);
    }
    out
}

/// Stable multi-key sort of `indices`. Nulls sort last in either direction;
/// unknown or non-sortable columns in the sort state are skipped.
pub fn sort_indices<T>(state: &ViewState, rows: &[T], columns: &ColumnRegistry<T>, indices: Vec<usize>) -> Vec<usize> {
    let keys: Vec<(&ColumnSpec<T>, SortDirection)> = state
        .sorting
        .iter()
        .filter_map(|s| columns.get(&s.column_id).filter(|c| c.sortable).map(|c| (c, s.direction)))
        .collect();
    if keys.is_empty() || indices.len() < 2 { return indices; }

    let mut keyed: Vec<(usize, Vec<Value>)> = indices
        .into_iter()
        .map(|i| (i, keys.iter().map(|(c, _)| c.value(&rows[i])).collect()))
        .collect();
    keyed.sort_by(|(_, a), (_, b)| {
        for (k, (_, dir)) in keys.iter().enumerate() {
            let ord = match (a[k].is_null(), b[k].is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let o = compare_values(&a[k], &b[k]);
                    if *dir == SortDirection::Desc { o.reverse() } else { o }
                }
            };
            if ord != Ordering::Equal { return ord; }
        }
        Ordering::Equal
    });
    keyed.into_iter().map(|(i, _)| i).collect()
}

/// Derive the current page. Pure: the stored page index is clamped for the
/// result only, never written back.
pub fn derive_visible<'a, T>(state: &ViewState, rows: &'a [T], columns: &ColumnRegistry<T>) -> Page<'a, T> {
    let started = Instant::now();
    let filtered = filtered_indices(state, rows, columns);
    let sorted = sort_indices(state, rows, columns, filtered);

    let page_size = state.pagination.page_size.max(1);
    let count = page_count(sorted.len(), page_size);
    let page_index = clamp_page_index(state.pagination.page_index, count);
    let start = (page_index * page_size).min(sorted.len());
    let end = (start + page_size).min(sorted.len());
    let page_rows: Vec<PageRow<'a, T>> = sorted[start..end].iter().map(|&i| PageRow { index: i, row: &rows[i] }).collect();

    let info = PageInfo { page_index, page_count: count, page_size, filtered_rows: sorted.len(), total_rows: rows.len() };
    metrics::histogram!("table_derive_ms", started.elapsed().as_secs_f64() * 1_000.0);
    debug!(total = info.total_rows, filtered = info.filtered_rows, page = page_index, pages = count, "derived visible rows");
    Page { rows: page_rows, info }
}

/// Distinct values of an option column over the filtered, unpaginated rows.
///
/// The column's own filter is not applied, so every choice stays selectable while
/// the other column filters and the global filter still narrow the set. Values keep
/// first-appearance order; `Null` is not a choice.
pub fn faceted_values<T>(state: &ViewState, rows: &[T], columns: &ColumnRegistry<T>, column_id: &str) -> Vec<FacetValue> {
    let Some(col) = columns.get(column_id) else { return Vec::new() };
    if col.filter_kind() != Some(FilterKind::Option) { return Vec::new(); }

    let mut order: Vec<(Value, usize)> = Vec::new();
    let mut seen: FxHashMap<(Discriminant<Value>, String), usize> = FxHashMap::default();
    for i in filtered_indices_except(state, rows, columns, Some(column_id)) {
        let v = col.value(&rows[i]);
        if v.is_null() { continue; }
        let key = (mem::discriminant(&v), v.to_string());
        match seen.get(&key) {
            Some(&slot) => order[slot].1 += 1,
            None => {
                seen.insert(key, order.len());
                order.push((v, 1));
            }
        }
    }
    order
        .into_iter()
        .map(|(v, count)| FacetValue { option: col.facet_option(&v), count })
        .collect()
}
