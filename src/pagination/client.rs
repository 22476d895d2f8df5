use crate::data::data_view::DataView;
use crate::data::row::Row;
use crate::pagination::paginator::PaginationState;
use tracing::trace;

/// In-memory pagination over the working set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPaginator {
    state: PaginationState,
}

impl ClientPaginator {
    pub fn new(per_page: usize) -> Self {
        Self {
            state: PaginationState::new(per_page),
        }
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    /// Recompute metadata for a new item count, keeping the page clamped
    pub fn set_total(&mut self, total_count: usize) {
        self.state =
            PaginationState::for_count(total_count, self.state.per_page, self.state.current_page);
    }

    /// Returns true when the page actually changed
    pub fn go_to_page(&mut self, page: usize) -> bool {
        let before = self.state.current_page;
        self.state =
            PaginationState::for_count(self.state.total_count, self.state.per_page, page);
        trace!("Client page {} -> {}", before, self.state.current_page);
        before != self.state.current_page
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.state.current_page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        self.go_to_page(self.state.current_page.saturating_sub(1))
    }

    /// Changing the page size always returns to the first page
    pub fn set_per_page(&mut self, per_page: usize) {
        self.state = PaginationState::for_count(self.state.total_count, per_page, 1);
    }

    pub fn reset(&mut self) {
        self.go_to_page(1);
    }

    /// Slice `items` to the current page
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.state.page_range();
        let end = range.end.min(items.len());
        let start = range.start.min(end);
        &items[start..end]
    }

    /// Current page of a working set
    pub fn page_of<R: Row>(&self, working_set: DataView<R>) -> DataView<R> {
        working_set.with_limit(self.state.per_page, self.state.offset())
    }
}
