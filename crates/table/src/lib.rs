//! Tabula view engine: owns rows, columns and view state for one table and
//! exposes the control surface a host UI drives.
//!
//! Control calls never fail. Calls naming an unknown column, a column lacking the
//! needed capability, or an operator/operand the column can't evaluate are ignored.

#![forbid(unsafe_code)]

use tabula_core::{ColumnRegistry, ColumnSpec, SortDirection};
use tabula_filter::{ColumnFilter, FilterOperand, FilterOperator};
use tracing::debug;

pub mod derive;
pub mod state;

pub use derive::{
    clamp_page_index, derive_visible, faceted_values, filtered_indices, page_count, sort_indices, FacetValue, Page,
    PageInfo, PageRow,
};
pub use state::{Pagination, SortEntry, ViewState};

pub const DEFAULT_PAGE_SIZES: [usize; 5] = [10, 20, 30, 40, 50];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    /// Page size choices offered to the user; the first is the default.
    pub page_sizes: Vec<usize>,
    /// Allow `toggle_sort_multi` to accumulate sort keys.
    pub multi_sort: bool,
    pub initial_page_size: Option<usize>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { page_sizes: DEFAULT_PAGE_SIZES.to_vec(), multi_sort: false, initial_page_size: None }
    }
}

impl TableConfig {
    /// Read `TABULA_PAGE_SIZES` (comma list) and `TABULA_MULTI_SORT` over the defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(s) = std::env::var("TABULA_PAGE_SIZES") {
            let sizes = parse_page_sizes(&s);
            if !sizes.is_empty() { cfg.page_sizes = sizes; }
        }
        if let Ok(s) = std::env::var("TABULA_MULTI_SORT") {
            cfg.multi_sort = matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        cfg
    }

    pub fn default_page_size(&self) -> usize {
        self.initial_page_size
            .filter(|n| *n > 0)
            .or_else(|| self.page_sizes.first().copied())
            .unwrap_or(DEFAULT_PAGE_SIZES[0])
    }
}

fn parse_page_sizes(s: &str) -> Vec<usize> {
    s.split(',').filter_map(|p| p.trim().parse::<usize>().ok()).filter(|n| *n > 0).collect()
}

fn ignored(op: &'static str, column_id: &str, reason: &'static str) {
    metrics::counter!("table_ignored_ops_total", 1u64, "op" => op);
    debug!(op, column = column_id, reason, "ignored table control call");
}

/// One table instance: caller rows + static columns + private view state.
pub struct Table<T> {
    rows: Vec<T>,
    columns: ColumnRegistry<T>,
    state: ViewState,
    config: TableConfig,
}

impl<T> Table<T> {
    pub fn new(rows: Vec<T>, columns: ColumnRegistry<T>) -> Self {
        Self::with_config(rows, columns, TableConfig::default())
    }

    pub fn with_config(rows: Vec<T>, columns: ColumnRegistry<T>, config: TableConfig) -> Self {
        let state = ViewState::new(config.default_page_size());
        Self { rows, columns, state, config }
    }

    pub fn rows(&self) -> &[T] { &self.rows }
    pub fn columns(&self) -> &ColumnRegistry<T> { &self.columns }
    pub fn state(&self) -> &ViewState { &self.state }
    pub fn config(&self) -> &TableConfig { &self.config }

    /// New data from the host (refetch). View state is kept; the page index is re-clamped.
    pub fn replace_rows(&mut self, rows: Vec<T>) {
        self.rows = rows;
        self.clamp_page();
    }

    // ---------------- filtering ----------------

    pub fn set_global_filter(&mut self, text: impl Into<String>) {
        self.state.global_filter = text.into();
        self.clamp_page();
    }

    /// Upsert (or with `None`/empty operand, remove) the filter for `column_id`.
    /// Existing entries keep their position; new ones are appended.
    pub fn set_column_filter(&mut self, column_id: &str, operator: FilterOperator, operand: Option<FilterOperand>) {
        let Some(col) = self.columns.get(column_id) else { return ignored("set_column_filter", column_id, "unknown column") };
        let Some(kind) = col.filter_kind() else { return ignored("set_column_filter", column_id, "column has no filter") };
        let operand = operand.filter(|o| !o.is_empty());
        let Some(operand) = operand else {
            self.state.column_filters.retain(|f| f.column_id != column_id);
            self.clamp_page();
            return;
        };
        if !operator.is_allowed_for(kind) || !operator.accepts(&operand) {
            return ignored("set_column_filter", column_id, "operator not valid for column");
        }
        let filter = ColumnFilter::new(column_id, operator, operand);
        match self.state.column_filters.iter_mut().find(|f| f.column_id == column_id) {
            Some(slot) => *slot = filter,
            None => self.state.column_filters.push(filter),
        }
        self.clamp_page();
    }

    pub fn clear_column_filters(&mut self) {
        self.state.column_filters.clear();
        self.clamp_page();
    }

    pub fn column_filter(&self, column_id: &str) -> Option<&ColumnFilter> { self.state.column_filter(column_id) }

    // ---------------- sorting ----------------

    /// Cycle unsorted -> asc -> desc -> unsorted, replacing any other sort.
    pub fn toggle_sort(&mut self, column_id: &str) { self.toggle_sort_inner(column_id, false) }

    /// Same cycle, but keeps other columns' entries (when multi-sort is enabled).
    pub fn toggle_sort_multi(&mut self, column_id: &str) { self.toggle_sort_inner(column_id, self.config.multi_sort) }

    fn toggle_sort_inner(&mut self, column_id: &str, multi: bool) {
        match self.columns.get(column_id) {
            Some(c) if c.sortable => {}
            Some(_) => return ignored("toggle_sort", column_id, "column not sortable"),
            None => return ignored("toggle_sort", column_id, "unknown column"),
        }
        let next = match self.state.sort_direction(column_id) {
            None => Some(SortDirection::Asc),
            Some(SortDirection::Asc) => Some(SortDirection::Desc),
            Some(SortDirection::Desc) => None,
        };
        let sorting = &mut self.state.sorting;
        if !multi {
            sorting.clear();
            if let Some(direction) = next { sorting.push(SortEntry { column_id: column_id.to_string(), direction }); }
            return;
        }
        match (sorting.iter().position(|s| s.column_id == column_id), next) {
            (Some(pos), Some(direction)) => sorting[pos].direction = direction,
            (Some(pos), None) => { sorting.remove(pos); }
            (None, Some(direction)) => sorting.push(SortEntry { column_id: column_id.to_string(), direction }),
            (None, None) => {}
        }
    }

    pub fn clear_sorting(&mut self) { self.state.sorting.clear() }

    pub fn sort_direction(&self, column_id: &str) -> Option<SortDirection> { self.state.sort_direction(column_id) }

    // ---------------- visibility ----------------

    pub fn set_column_visibility(&mut self, column_id: &str, visible: bool) {
        match self.columns.get(column_id) {
            Some(c) if c.hideable => {
                self.state.column_visibility.insert(column_id.to_string(), visible);
            }
            Some(_) => ignored("set_column_visibility", column_id, "column not hideable"),
            None => ignored("set_column_visibility", column_id, "unknown column"),
        }
    }

    pub fn reset_column_visibility(&mut self) { self.state.column_visibility.clear() }

    pub fn is_column_visible(&self, column_id: &str) -> bool {
        self.columns.contains(column_id) && self.state.is_visible(column_id)
    }

    /// Visible columns in registry order.
    pub fn visible_columns(&self) -> Vec<&ColumnSpec<T>> {
        self.columns.iter().filter(|c| self.state.is_visible(&c.id)).collect()
    }

    // ---------------- pagination ----------------

    pub fn page_count(&self) -> usize {
        page_count(filtered_indices(&self.state, &self.rows, &self.columns).len(), self.state.pagination.page_size)
    }

    pub fn page_info(&self) -> PageInfo {
        let filtered = filtered_indices(&self.state, &self.rows, &self.columns).len();
        let page_size = self.state.pagination.page_size;
        let count = page_count(filtered, page_size);
        PageInfo {
            page_index: clamp_page_index(self.state.pagination.page_index, count),
            page_count: count,
            page_size,
            filtered_rows: filtered,
            total_rows: self.rows.len(),
        }
    }

    /// Zero is ignored. The page index is clamped to the new page count.
    pub fn set_page_size(&mut self, size: usize) {
        if size == 0 { return ignored("set_page_size", "", "zero page size"); }
        self.state.pagination.page_size = size;
        self.clamp_page();
    }

    pub fn go_to_page(&mut self, index: usize) {
        let count = self.page_count();
        self.state.pagination.page_index = clamp_page_index(index, count);
    }

    pub fn next_page(&mut self) {
        let info = self.page_info();
        if info.can_next() { self.state.pagination.page_index = info.page_index + 1; }
    }

    pub fn previous_page(&mut self) {
        let info = self.page_info();
        if info.can_previous() { self.state.pagination.page_index = info.page_index - 1; }
    }

    pub fn first_page(&mut self) { self.state.pagination.page_index = 0 }

    pub fn last_page(&mut self) {
        let count = self.page_count();
        self.state.pagination.page_index = count.saturating_sub(1);
    }

    fn clamp_page(&mut self) {
        let count = self.page_count();
        let p = &mut self.state.pagination;
        p.page_index = clamp_page_index(p.page_index, count);
    }

    // ---------------- derivation ----------------

    pub fn visible_rows(&self) -> Page<'_, T> { derive_visible(&self.state, &self.rows, &self.columns) }

    pub fn faceted_values(&self, column_id: &str) -> Vec<FacetValue> {
        faceted_values(&self.state, &self.rows, &self.columns, column_id)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("rows", &self.rows.len())
            .field("columns", &self.columns)
            .field("state", &self.state)
            .finish()
    }
}
