use crate::data::column_model::{ColumnDescriptor, ACTIONS_COLUMN};
use crate::data::row::Row;
use crate::data::value::DataValue;
use serde::Serialize;
use std::sync::Arc;

/// Per-table cell override. `None` falls back to the default formatter.
pub type RenderCellFn<R> = Arc<dyn Fn(&R, &str) -> Option<String> + Send + Sync>;

/// Produces the interactive actions for a row
pub type RenderActionsFn<R> = Arc<dyn Fn(&R) -> Vec<RowAction> + Send + Sync>;

/// One interactive affordance inside the actions column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowAction {
    pub id: String,
    pub label: String,
    pub disabled: bool,
}

impl RowAction {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            disabled: false,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Displayable content of a single cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CellContent {
    Text(String),
    /// Value was null or missing
    Placeholder,
    Actions(Vec<RowAction>),
}

impl CellContent {
    /// Searchable text of the cell. Placeholders and actions have none.
    pub fn text(&self) -> Option<&str> {
        match self {
            CellContent::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Flattened form used by exporters; interactive content exports empty
    pub fn to_plain_string(&self) -> String {
        match self {
            CellContent::Text(s) => s.clone(),
            CellContent::Placeholder | CellContent::Actions(_) => String::new(),
        }
    }
}

/// Maps rows and column keys to cell content
pub struct CellRenderer<R> {
    render_cell: Option<RenderCellFn<R>>,
    render_actions: Option<RenderActionsFn<R>>,
    placeholder: String,
}

impl<R> Clone for CellRenderer<R> {
    fn clone(&self) -> Self {
        Self {
            render_cell: self.render_cell.clone(),
            render_actions: self.render_actions.clone(),
            placeholder: self.placeholder.clone(),
        }
    }
}

impl<R> Default for CellRenderer<R> {
    fn default() -> Self {
        Self {
            render_cell: None,
            render_actions: None,
            placeholder: String::new(),
        }
    }
}

impl<R: Row> CellRenderer<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_render_cell(mut self, render_cell: Option<RenderCellFn<R>>) -> Self {
        self.render_cell = render_cell;
        self
    }

    pub fn with_render_actions(mut self, render_actions: Option<RenderActionsFn<R>>) -> Self {
        self.render_actions = render_actions;
        self
    }

    /// Text shown on screen for null values
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn has_actions(&self) -> bool {
        self.render_actions.is_some()
    }

    /// Render one cell.
    ///
    /// The actions column never reads row data. Other columns try the caller
    /// override first, then the default formatter.
    pub fn render_cell(&self, row: &R, key: &str) -> CellContent {
        if key == ACTIONS_COLUMN {
            return match &self.render_actions {
                Some(render) => CellContent::Actions(render(row)),
                None => CellContent::Placeholder,
            };
        }

        if let Some(text) = self.render_cell.as_ref().and_then(|render| render(row, key)) {
            return CellContent::Text(text);
        }

        match row.value(key) {
            DataValue::Null => CellContent::Placeholder,
            value => CellContent::Text(value.to_string()),
        }
    }

    /// Columns the renderer produces output for. The actions column is
    /// dropped when no actions callback is supplied.
    pub fn renderable_columns<'a>(
        &self,
        columns: &[&'a ColumnDescriptor],
    ) -> Vec<&'a ColumnDescriptor> {
        columns
            .iter()
            .copied()
            .filter(|c| !c.is_actions() || self.has_actions())
            .collect()
    }

    pub fn render_row(&self, row: &R, columns: &[&ColumnDescriptor]) -> Vec<CellContent> {
        self.renderable_columns(columns)
            .iter()
            .map(|c| self.render_cell(row, &c.key))
            .collect()
    }

    /// Display text of a cell as shown on screen, placeholder included
    pub fn display_text(&self, row: &R, key: &str) -> String {
        match self.render_cell(row, key) {
            CellContent::Text(s) => s,
            CellContent::Placeholder => self.placeholder.clone(),
            CellContent::Actions(actions) => actions
                .iter()
                .map(|a| a.label.as_str())
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}
