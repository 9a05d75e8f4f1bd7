//! Column descriptors and the per-table column registry.
//!
//! This module provides:
//! - `ColumnSpec<T>`: id + accessor + display metadata + capability flags
//! - `ColumnRegistry<T>`: the ordered, id-unique column list a table is built from
//! - `CellRenderer<T>`: the host-side seam that turns a cell into text

#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::format::capitalize;
use crate::{CoreError, Value};

/// Pure projection from a row to a cell value.
pub type Accessor<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;

/// Annotates a distinct option value for filter choice lists.
pub type OptionTransform = Arc<dyn Fn(&Value) -> FacetOption + Send + Sync>;

/// Which predicate family (and which editor) a column filter uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Text,
    Option,
    Date,
    Number,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Text => "text",
            FilterKind::Option => "option",
            FilterKind::Date => "date",
            FilterKind::Number => "number",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub label: String,
    pub icon: Option<String>,
    pub filter: Option<FilterKind>,
}

/// One distinct option value with its display annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetOption {
    pub value: String,
    pub label: String,
    pub icon: Option<String>,
}

impl FacetOption {
    /// Fallback annotation: the value itself, capitalized.
    pub fn plain(value: &Value) -> Self {
        let raw = value.to_string();
        Self { label: capitalize(&raw), value: raw, icon: None }
    }
}

pub struct ColumnSpec<T> {
    pub id: String,
    pub meta: ColumnMeta,
    pub sortable: bool,
    pub hideable: bool,
    pub searchable: bool,
    accessor: Option<Accessor<T>>,
    transform: Option<OptionTransform>,
}

impl<T> ColumnSpec<T> {
    /// Data column backed by an accessor. Sortable and hideable by default.
    pub fn accessor<F>(id: impl Into<String>, label: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            meta: ColumnMeta { label: label.into(), icon: None, filter: None },
            sortable: true,
            hideable: true,
            searchable: false,
            accessor: Some(Arc::new(f)),
            transform: None,
        }
    }

    /// Presentation-only column (row number, actions). Never sorted, filtered or searched.
    pub fn display(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            meta: ColumnMeta { label: label.into(), icon: None, filter: None },
            sortable: false,
            hideable: true,
            searchable: false,
            accessor: None,
            transform: None,
        }
    }

    pub fn text_filter(self) -> Self { self.with_filter(FilterKind::Text) }
    pub fn date_filter(self) -> Self { self.with_filter(FilterKind::Date) }
    pub fn number_filter(self) -> Self { self.with_filter(FilterKind::Number) }

    pub fn option_filter<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Value) -> FacetOption + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self.with_filter(FilterKind::Option)
    }

    fn with_filter(mut self, kind: FilterKind) -> Self {
        if self.accessor.is_none() { return self; }
        self.meta.filter = Some(kind);
        // dates only match the global search when explicitly enabled
        self.searchable = !matches!(kind, FilterKind::Date);
        self
    }

    pub fn sortable(mut self, on: bool) -> Self { self.sortable = on && self.accessor.is_some(); self }
    pub fn hideable(mut self, on: bool) -> Self { self.hideable = on; self }
    pub fn searchable(mut self, on: bool) -> Self { self.searchable = on && self.accessor.is_some(); self }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.meta.icon = Some(icon.into());
        self
    }

    pub fn filter_kind(&self) -> Option<FilterKind> { self.meta.filter }

    pub fn has_accessor(&self) -> bool { self.accessor.is_some() }

    /// Project a row. Display columns yield `Null`.
    pub fn value(&self, row: &T) -> Value {
        match &self.accessor {
            Some(f) => f(row),
            None => Value::Null,
        }
    }

    /// Annotate an option value; columns without a transform use the plain fallback.
    pub fn facet_option(&self, value: &Value) -> FacetOption {
        match &self.transform {
            Some(t) => t(value),
            None => FacetOption::plain(value),
        }
    }
}

impl<T> Clone for ColumnSpec<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            meta: self.meta.clone(),
            sortable: self.sortable,
            hideable: self.hideable,
            searchable: self.searchable,
            accessor: self.accessor.clone(),
            transform: self.transform.clone(),
        }
    }
}

impl<T> fmt::Debug for ColumnSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("id", &self.id)
            .field("meta", &self.meta)
            .field("sortable", &self.sortable)
            .field("hideable", &self.hideable)
            .field("searchable", &self.searchable)
            .field("display_only", &self.accessor.is_none())
            .finish()
    }
}

/// Ordered column set for one table instance. Immutable once built.
pub struct ColumnRegistry<T> {
    columns: Vec<ColumnSpec<T>>,
}

impl<T> ColumnRegistry<T> {
    pub fn new(columns: Vec<ColumnSpec<T>>) -> Result<Self, CoreError> {
        let mut seen: Vec<&str> = Vec::with_capacity(columns.len());
        for c in columns.iter() {
            if c.id.is_empty() { return Err(CoreError::EmptyColumnId); }
            if seen.contains(&c.id.as_str()) { return Err(CoreError::DuplicateColumn(c.id.clone())); }
            seen.push(c.id.as_str());
        }
        Ok(Self { columns })
    }

    pub fn get(&self, id: &str) -> Option<&ColumnSpec<T>> { self.columns.iter().find(|c| c.id == id) }
    pub fn position(&self, id: &str) -> Option<usize> { self.columns.iter().position(|c| c.id == id) }
    pub fn contains(&self, id: &str) -> bool { self.get(id).is_some() }
    pub fn iter(&self) -> std::slice::Iter<'_, ColumnSpec<T>> { self.columns.iter() }
    pub fn len(&self) -> usize { self.columns.len() }
    pub fn is_empty(&self) -> bool { self.columns.is_empty() }
    pub fn ids(&self) -> impl Iterator<Item = &str> { self.columns.iter().map(|c| c.id.as_str()) }

    /// Columns a global search term is matched against.
    pub fn searchable(&self) -> impl Iterator<Item = &ColumnSpec<T>> { self.columns.iter().filter(|c| c.searchable) }
}

impl<T> Clone for ColumnRegistry<T> {
    fn clone(&self) -> Self { Self { columns: self.columns.clone() } }
}

impl<T> fmt::Debug for ColumnRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.columns.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a ColumnRegistry<T> {
    type Item = &'a ColumnSpec<T>;
    type IntoIter = std::slice::Iter<'a, ColumnSpec<T>>;
    fn into_iter(self) -> Self::IntoIter { self.columns.iter() }
}

/// Host-side rendering strategy keyed by column. The engine never renders cells.
pub trait CellRenderer<T> {
    /// `index` is the row's original position in the input sequence.
    fn render(&self, column: &ColumnSpec<T>, index: usize, row: &T) -> String;
}

/// Renders the projected value as-is; display columns render empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl<T> CellRenderer<T> for PlainRenderer {
    fn render(&self, column: &ColumnSpec<T>, _index: usize, row: &T) -> String {
        column.value(row).to_string()
    }
}
