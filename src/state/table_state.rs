use crate::data::column_model::{ColumnDescriptor, ColumnModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    None,
    Ascending,
    Descending,
}

impl SortDirection {
    /// Header click cycle: none -> ascending -> descending -> none
    pub fn next(self) -> Self {
        match self {
            SortDirection::None => SortDirection::Ascending,
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::None,
        }
    }
}

/// At most one active sort column
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortState {
    pub key: Option<String>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn is_active(&self) -> bool {
        self.key.is_some() && self.direction != SortDirection::None
    }

    /// Direction shown on the header of `key`
    pub fn direction_for(&self, key: &str) -> SortDirection {
        match &self.key {
            Some(k) if k == key => self.direction,
            _ => SortDirection::None,
        }
    }
}

/// The persisted slice of table state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSnapshot {
    pub column_order: Vec<String>,
    pub hidden_columns: Vec<String>,
}

/// Per-instance table state: search, sort and column layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    search_term: String,
    sort: SortState,
    column_order: Vec<String>,
    hidden_columns: BTreeSet<String>,
}

impl TableState {
    /// Default layout: model order, each column's default visibility
    pub fn from_model(model: &ColumnModel) -> Self {
        Self {
            search_term: String::new(),
            sort: SortState::default(),
            column_order: model.keys(),
            hidden_columns: model
                .iter()
                .filter(|c| !c.default_visible && c.hideable)
                .map(|c| c.key.clone())
                .collect(),
        }
    }

    /// Rebuild state from a persisted layout.
    ///
    /// Keys no longer in the model are dropped, model columns missing from
    /// the snapshot are appended in model order, and a snapshot that would
    /// hide every column falls back to default visibility.
    pub fn restore(model: &ColumnModel, snapshot: &LayoutSnapshot) -> Self {
        let mut state = Self::from_model(model);

        let mut order: Vec<String> = Vec::with_capacity(model.len());
        for key in &snapshot.column_order {
            if model.contains(key) && !order.contains(key) {
                order.push(key.clone());
            } else {
                trace!("Dropping persisted column key '{}'", key);
            }
        }
        // Columns the snapshot never saw start with their default visibility
        let mut hidden: BTreeSet<String> = BTreeSet::new();
        for column in model.iter() {
            if !order.contains(&column.key) {
                if !column.default_visible && column.hideable {
                    hidden.insert(column.key.clone());
                }
                order.push(column.key.clone());
            }
        }
        state.column_order = order;

        hidden.extend(
            snapshot
                .hidden_columns
                .iter()
                .filter(|key| model.get(key).is_some_and(|c| c.hideable))
                .cloned(),
        );
        if model
            .iter()
            .any(|c| !c.is_actions() && !hidden.contains(&c.key))
        {
            state.hidden_columns = hidden;
        } else {
            debug!("Persisted layout hides every column, using defaults");
        }

        state
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            column_order: self.column_order.clone(),
            hidden_columns: self.hidden_columns.iter().cloned().collect(),
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Returns true when the term changed
    pub fn set_search(&mut self, term: &str) -> bool {
        if self.search_term == term {
            return false;
        }
        self.search_term = term.to_string();
        true
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    /// Handle a header click. Non-sortable or unknown columns are a no-op.
    pub fn toggle_sort(&mut self, model: &ColumnModel, key: &str) -> bool {
        let Some(column) = model.get(key) else {
            return false;
        };
        if !column.sortable {
            return false;
        }

        let direction = self.sort.direction_for(key).next();
        self.sort = if direction == SortDirection::None {
            SortState::default()
        } else {
            SortState {
                key: Some(key.to_string()),
                direction,
            }
        };
        debug!("Sort changed to {:?}", self.sort);
        true
    }

    /// Set the sort explicitly. Rejected for non-sortable columns.
    pub fn set_sort(&mut self, model: &ColumnModel, key: &str, direction: SortDirection) -> bool {
        if !model.get(key).is_some_and(|c| c.sortable) {
            return false;
        }
        let next = if direction == SortDirection::None {
            SortState::default()
        } else {
            SortState {
                key: Some(key.to_string()),
                direction,
            }
        };
        if next == self.sort {
            return false;
        }
        self.sort = next;
        true
    }

    pub fn clear_sort(&mut self) -> bool {
        if self.sort == SortState::default() {
            return false;
        }
        self.sort = SortState::default();
        true
    }

    pub fn column_order(&self) -> &[String] {
        &self.column_order
    }

    pub fn hidden_columns(&self) -> &BTreeSet<String> {
        &self.hidden_columns
    }

    pub fn is_visible(&self, key: &str) -> bool {
        !self.hidden_columns.contains(key)
    }

    /// Visible columns in current display order
    pub fn visible_columns<'m>(&self, model: &'m ColumnModel) -> Vec<&'m ColumnDescriptor> {
        self.column_order
            .iter()
            .filter(|key| self.is_visible(key))
            .filter_map(|key| model.get(key))
            .collect()
    }

    /// Hide a column. Refuses non-hideable columns and the last visible one.
    pub fn hide_column(&mut self, model: &ColumnModel, key: &str) -> bool {
        let Some(column) = model.get(key) else {
            return false;
        };
        if !column.hideable || !self.is_visible(key) {
            return false;
        }
        let visible_data_columns = self
            .visible_columns(model)
            .iter()
            .filter(|c| !c.is_actions())
            .count();
        if visible_data_columns <= 1 {
            debug!("Refusing to hide last visible column '{}'", key);
            return false;
        }
        self.hidden_columns.insert(key.to_string())
    }

    pub fn show_column(&mut self, key: &str) -> bool {
        self.hidden_columns.remove(key)
    }

    pub fn toggle_column_visibility(&mut self, model: &ColumnModel, key: &str) -> bool {
        if self.is_visible(key) {
            self.hide_column(model, key)
        } else {
            self.show_column(key)
        }
    }

    /// Drag-and-drop reorder: remove `active` and insert it at `over`'s slot
    pub fn move_column(&mut self, model: &ColumnModel, active: &str, over: &str) -> bool {
        if active == over || !Self::is_draggable(model, active) || !Self::is_draggable(model, over)
        {
            return false;
        }
        let (Some(from), Some(to)) = (self.position(active), self.position(over)) else {
            return false;
        };

        let key = self.column_order.remove(from);
        self.column_order.insert(to, key);
        true
    }

    /// Move a column one slot left among draggable columns, wrapping to the end
    pub fn move_column_left(&mut self, model: &ColumnModel, key: &str) -> bool {
        self.shift_column(model, key, false)
    }

    /// Move a column one slot right among draggable columns, wrapping to the start
    pub fn move_column_right(&mut self, model: &ColumnModel, key: &str) -> bool {
        self.shift_column(model, key, true)
    }

    fn shift_column(&mut self, model: &ColumnModel, key: &str, right: bool) -> bool {
        if !Self::is_draggable(model, key) {
            return false;
        }
        // Slots occupied by draggable columns; fixed columns keep their place
        let slots: Vec<usize> = self
            .column_order
            .iter()
            .enumerate()
            .filter(|(_, k)| Self::is_draggable(model, k))
            .map(|(i, _)| i)
            .collect();
        if slots.len() < 2 {
            return false;
        }
        let Some(pos) = slots.iter().position(|&i| self.column_order[i] == key) else {
            return false;
        };

        let target = if right {
            (pos + 1) % slots.len()
        } else {
            (pos + slots.len() - 1) % slots.len()
        };

        let mut keys: Vec<String> = slots.iter().map(|&i| self.column_order[i].clone()).collect();
        let moved = keys.remove(pos);
        keys.insert(target, moved);
        for (slot, key) in slots.into_iter().zip(keys) {
            self.column_order[slot] = key;
        }
        true
    }

    /// Restore model order and default visibility. Search and sort are kept.
    pub fn reset_layout(&mut self, model: &ColumnModel) {
        let defaults = Self::from_model(model);
        self.column_order = defaults.column_order;
        self.hidden_columns = defaults.hidden_columns;
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.column_order.iter().position(|k| k == key)
    }

    fn is_draggable(model: &ColumnModel, key: &str) -> bool {
        model
            .get(key)
            .is_some_and(|c| c.draggable && !c.is_actions())
    }
}
