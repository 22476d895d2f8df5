use std::sync::Arc;

use crate::data::column_model::{ColumnDescriptor, ColumnModel};
use crate::data::row::Row;
use crate::data::value_compare::compare_values;
use crate::render::cell_renderer::CellRenderer;
use crate::state::table_state::{SortDirection, TableState};

/// A view over a row snapshot that can filter, sort and page
/// without modifying the underlying rows
pub struct DataView<R> {
    /// The underlying immutable rows
    source: Arc<Vec<R>>,

    /// Row indices that are visible (after filtering and sorting)
    visible_rows: Vec<usize>,

    /// Limit and offset for pagination
    limit: Option<usize>,
    offset: usize,
}

impl<R> Clone for DataView<R> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            visible_rows: self.visible_rows.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl<R: Row> DataView<R> {
    /// Create a new view showing all rows in input order
    pub fn new(source: Arc<Vec<R>>) -> Self {
        let row_count = source.len();
        Self {
            source,
            visible_rows: (0..row_count).collect(),
            limit: None,
            offset: 0,
        }
    }

    /// Create a view with specific rows
    pub fn with_rows(mut self, rows: Vec<usize>) -> Self {
        self.visible_rows = rows
            .into_iter()
            .filter(|&idx| idx < self.source.len())
            .collect();
        self
    }

    /// Apply limit and offset
    pub fn with_limit(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    /// Filter rows based on a predicate, preserving order
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&R) -> bool,
    {
        let source = &self.source;
        self.visible_rows.retain(|&row_idx| predicate(&source[row_idx]));
        self
    }

    /// Case-insensitive substring search over the rendered text of `columns`.
    /// An empty term leaves the view untouched.
    pub fn search(self, term: &str, columns: &[&ColumnDescriptor], renderer: &CellRenderer<R>) -> Self {
        if term.is_empty() {
            return self;
        }
        let needle = term.to_lowercase();
        self.filter(|row| {
            columns.iter().filter(|c| !c.is_actions()).any(|c| {
                renderer
                    .render_cell(row, &c.key)
                    .text()
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        })
    }

    /// Stable sort by a column's raw value using its declared type.
    /// `SortDirection::None` restores input order.
    pub fn sort_by(mut self, column: &ColumnDescriptor, direction: SortDirection) -> Self {
        let source = &self.source;
        match direction {
            SortDirection::None => self.visible_rows.sort_unstable(),
            SortDirection::Ascending | SortDirection::Descending => {
                // Rebase on input order so the result never depends on a prior sort
                self.visible_rows.sort_unstable();
                self.visible_rows.sort_by(|&a, &b| {
                    let cmp = compare_values(
                        &source[a].value(&column.key),
                        &source[b].value(&column.key),
                        column.value_type,
                    );
                    if direction == SortDirection::Descending {
                        cmp.reverse()
                    } else {
                        cmp
                    }
                });
            }
        }
        self
    }

    /// Get the number of visible rows (respecting limit/offset)
    pub fn row_count(&self) -> usize {
        let available = self.visible_rows.len().saturating_sub(self.offset);
        match self.limit {
            Some(limit) => available.min(limit),
            None => available,
        }
    }

    /// Number of rows after filtering, ignoring limit/offset
    pub fn total_count(&self) -> usize {
        self.visible_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Get a row by index (respecting limit/offset)
    pub fn get_row(&self, index: usize) -> Option<&R> {
        if let Some(limit) = self.limit {
            if index >= limit {
                return None;
            }
        }
        let row_idx = *self.visible_rows.get(index + self.offset)?;
        self.source.get(row_idx)
    }

    /// Get all visible rows (respecting limit/offset)
    pub fn rows(&self) -> Vec<&R> {
        (0..self.row_count()).filter_map(|i| self.get_row(i)).collect()
    }

    /// Visible rows ignoring limit/offset
    pub fn all_rows(&self) -> Vec<&R> {
        self.visible_rows.iter().map(|&i| &self.source[i]).collect()
    }

    /// Get the source rows
    pub fn source(&self) -> &Arc<Vec<R>> {
        &self.source
    }

    /// Get visible row indices (before limit/offset)
    pub fn visible_row_indices(&self) -> &[usize] {
        &self.visible_rows
    }
}

/// Filter then sort `rows` according to `state`.
///
/// Search matches only visible columns; hidden columns keep their data in
/// the row but are never consulted.
pub fn compute_working_set<R: Row>(
    rows: Arc<Vec<R>>,
    state: &TableState,
    model: &ColumnModel,
    renderer: &CellRenderer<R>,
) -> DataView<R> {
    let visible = state.visible_columns(model);
    let view = DataView::new(rows).search(state.search_term(), &visible, renderer);

    match state.sort().key.as_deref().and_then(|key| model.get(key)) {
        Some(column) if column.sortable => view.sort_by(column, state.sort().direction),
        _ => view,
    }
}
