use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// How "select all" is scoped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Only rows on the currently rendered page
    #[default]
    Page,
    /// Every row the table can resolve. In server mode this accumulates the
    /// loaded pages into the selection as the user pages through.
    AcrossPages,
}

/// Header checkbox state over the currently rendered selectable rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    Unchecked,
    Indeterminate,
    Checked,
}

/// Selected row identifiers for one table instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: BTreeSet<String>,
    policy: SelectionPolicy,
}

impl SelectionState {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            selected: BTreeSet::new(),
            policy,
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: SelectionPolicy) {
        self.policy = policy;
    }

    /// Add or remove one id. Checking an id outside `selectable` is rejected.
    pub fn select_row(&mut self, id: &str, checked: bool, selectable: &[String]) -> bool {
        if checked {
            if !selectable.iter().any(|candidate| candidate == id) {
                return false;
            }
            self.selected.insert(id.to_string())
        } else {
            self.selected.remove(id)
        }
    }

    /// Check or clear the header checkbox.
    ///
    /// `page_ids` are the selectable ids on the rendered page and `all_ids`
    /// the ids reachable under `AcrossPages`.
    pub fn select_all(&mut self, checked: bool, page_ids: &[String], all_ids: &[String]) -> bool {
        let before = self.selected.clone();
        if checked {
            match self.policy {
                SelectionPolicy::Page => {
                    self.selected = page_ids.iter().cloned().collect();
                }
                SelectionPolicy::AcrossPages => {
                    self.selected.extend(all_ids.iter().cloned());
                }
            }
        } else {
            self.selected.clear();
        }
        before != self.selected
    }

    pub fn header_state(&self, page_ids: &[String]) -> SelectAllState {
        if !page_ids.is_empty() && page_ids.iter().all(|id| self.selected.contains(id)) {
            SelectAllState::Checked
        } else if self.selected.is_empty() {
            SelectAllState::Unchecked
        } else {
            SelectAllState::Indeterminate
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Bulk-action affordance shows exactly when something is selected
    pub fn bulk_actions_visible(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.selected.is_empty();
        self.selected.clear();
        changed
    }
}

/// Handler invoked with the resolved selected rows
pub type BulkActionFn<R> = Arc<dyn Fn(&[&R]) + Send + Sync>;

/// Named action over the current selection
pub struct BulkAction<R> {
    pub label: String,
    handler: BulkActionFn<R>,
}

impl<R> BulkAction<R> {
    pub fn new(label: impl Into<String>, handler: BulkActionFn<R>) -> Self {
        Self {
            label: label.into(),
            handler,
        }
    }

    pub fn invoke(&self, rows: &[&R]) {
        (self.handler)(rows)
    }
}

impl<R> Clone for BulkAction<R> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<R> fmt::Debug for BulkAction<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkAction").field("label", &self.label).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_row_rejects_unknown_ids() {
        let mut selection = SelectionState::default();
        let page = ids(&["1", "2"]);
        assert!(selection.select_row("1", true, &page));
        assert!(!selection.select_row("99", true, &page));
        assert_eq!(selection.selected_ids(), vec!["1"]);
        assert!(selection.select_row("1", false, &page));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_select_all_is_page_scoped_by_default() {
        let mut selection = SelectionState::default();
        let page = ids(&["1", "2"]);
        let all = ids(&["1", "2", "3", "4"]);
        selection.select_all(true, &page, &all);
        assert_eq!(selection.selected_ids(), page);
        assert_eq!(selection.header_state(&page), SelectAllState::Checked);
    }

    #[test]
    fn test_select_all_across_pages() {
        let mut selection = SelectionState::new(SelectionPolicy::AcrossPages);
        let page = ids(&["1", "2"]);
        let all = ids(&["1", "2", "3", "4"]);
        selection.select_all(true, &page, &all);
        assert_eq!(selection.len(), 4);
        assert!(selection.select_all(false, &page, &all));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_header_state() {
        let mut selection = SelectionState::default();
        let page = ids(&["1", "2"]);
        assert_eq!(selection.header_state(&page), SelectAllState::Unchecked);
        selection.select_row("2", true, &page);
        assert_eq!(selection.header_state(&page), SelectAllState::Indeterminate);
        assert!(selection.bulk_actions_visible());
        assert_eq!(selection.header_state(&[]), SelectAllState::Indeterminate);
    }

    #[test]
    fn test_bulk_action_invocation() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let action = BulkAction::<u32>::new(
            "Archive",
            Arc::new(move |rows: &[&u32]| {
                counter.fetch_add(rows.len(), Ordering::SeqCst);
            }),
        );
        action.invoke(&[&1, &2]);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
