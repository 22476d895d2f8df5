use crate::data::value::ValueType;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Column key whose cells come from the actions callback, never from row data
pub const ACTIONS_COLUMN: &str = "actions";

/// Declarative description of one table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub key: String,
    pub label: String,
    pub sortable: bool,
    pub hideable: bool,
    pub draggable: bool,
    pub default_visible: bool,
    pub value_type: ValueType,
}

impl ColumnDescriptor {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            sortable: true,
            hideable: true,
            draggable: true,
            default_visible: true,
            value_type: ValueType::Text,
        }
    }

    /// The distinguished actions column
    pub fn actions(label: impl Into<String>) -> Self {
        Self {
            key: ACTIONS_COLUMN.to_string(),
            label: label.into(),
            sortable: false,
            hideable: false,
            draggable: false,
            default_visible: true,
            value_type: ValueType::Text,
        }
    }

    pub fn with_sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn with_hideable(mut self, hideable: bool) -> Self {
        self.hideable = hideable;
        self
    }

    pub fn with_draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }

    pub fn with_default_visible(mut self, visible: bool) -> Self {
        self.default_visible = visible;
        self
    }

    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn is_actions(&self) -> bool {
        self.key == ACTIONS_COLUMN
    }
}

/// Ordered, validated set of column descriptors for one table instance
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnModel {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnModel {
    /// Build a column model.
    ///
    /// Duplicate keys, an empty model, or a model with no column visible by
    /// default are caller bugs and are rejected.
    pub fn new(columns: Vec<ColumnDescriptor>) -> Result<Self> {
        if columns.is_empty() {
            bail!("Column model must contain at least one column");
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.key.as_str()) {
                bail!("Duplicate column key '{}'", column.key);
            }
        }

        if !columns.iter().any(|c| c.default_visible) {
            bail!("At least one column must be visible by default");
        }

        Ok(Self { columns })
    }

    pub fn get(&self, key: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.key.clone()).collect()
    }

    /// Keys hidden in the default layout
    pub fn default_hidden(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !c.default_visible)
            .map(|c| c.key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_keys_rejected() {
        let result = ColumnModel::new(vec![
            ColumnDescriptor::new("id", "ID"),
            ColumnDescriptor::new("id", "Identifier"),
        ]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Duplicate column key 'id'"));
    }

    #[test]
    fn test_empty_model_rejected() {
        assert!(ColumnModel::new(vec![]).is_err());
    }

    #[test]
    fn test_all_hidden_by_default_rejected() {
        let result = ColumnModel::new(vec![
            ColumnDescriptor::new("a", "A").with_default_visible(false)
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_lookup() {
        let model = ColumnModel::new(vec![
            ColumnDescriptor::new("id", "ID").with_type(ValueType::Number),
            ColumnDescriptor::new("name", "Name").with_default_visible(false),
            ColumnDescriptor::actions("Actions"),
        ])
        .unwrap();

        assert_eq!(model.len(), 3);
        assert_eq!(model.index_of("name"), Some(1));
        assert_eq!(model.default_hidden(), vec!["name"]);
        assert!(model.get(ACTIONS_COLUMN).unwrap().is_actions());
        assert!(!model.get(ACTIONS_COLUMN).unwrap().sortable);
    }
}
