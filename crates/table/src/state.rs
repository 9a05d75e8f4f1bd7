//! View state owned by one table instance.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tabula_core::SortDirection;
use tabula_filter::ColumnFilter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub column_id: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page_index: usize,
    pub page_size: usize,
}

/// Interactive state of one table. Mutated only through `Table` control calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub global_filter: String,
    /// Insertion order is application order, not display order.
    pub column_filters: Vec<ColumnFilter>,
    /// First entry is the primary key; later entries break ties.
    pub sorting: SmallVec<[SortEntry; 2]>,
    /// Absent ids are visible.
    pub column_visibility: FxHashMap<String, bool>,
    pub pagination: Pagination,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            global_filter: String::new(),
            column_filters: Vec::new(),
            sorting: SmallVec::new(),
            column_visibility: FxHashMap::default(),
            pagination: Pagination { page_index: 0, page_size: page_size.max(1) },
        }
    }

    pub fn column_filter(&self, column_id: &str) -> Option<&ColumnFilter> {
        self.column_filters.iter().find(|f| f.column_id == column_id)
    }

    pub fn sort_direction(&self, column_id: &str) -> Option<SortDirection> {
        self.sorting.iter().find(|s| s.column_id == column_id).map(|s| s.direction)
    }

    pub fn is_visible(&self, column_id: &str) -> bool {
        self.column_visibility.get(column_id).copied().unwrap_or(true)
    }
}
