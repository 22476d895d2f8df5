use serde::Serialize;
use std::ops::Range;

/// Page count for `total_count` items, never less than one
pub fn total_pages(total_count: usize, per_page: usize) -> usize {
    let per_page = per_page.max(1);
    total_count.div_ceil(per_page).max(1)
}

/// Pagination metadata; `current_page` is 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    pub current_page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationState {
    pub fn new(per_page: usize) -> Self {
        Self::for_count(0, per_page, 1)
    }

    /// Client-mode metadata. `requested_page` is clamped to `[1, total_pages]`.
    pub fn for_count(total_count: usize, per_page: usize, requested_page: usize) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total_pages(total_count, per_page);
        Self::build(requested_page, per_page, total_pages, total_count)
    }

    /// Server-mode metadata taken from a page response. A zero page count
    /// from the server is read as one empty page.
    pub fn from_server(
        current_page: usize,
        per_page: usize,
        total_count: usize,
        total_pages: usize,
    ) -> Self {
        Self::build(current_page, per_page.max(1), total_pages.max(1), total_count)
    }

    fn build(page: usize, per_page: usize, total_pages: usize, total_count: usize) -> Self {
        let current_page = page.clamp(1, total_pages);
        Self {
            current_page,
            per_page,
            total_pages,
            total_count,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }

    pub fn clamp_page(&self, page: usize) -> usize {
        page.clamp(1, self.total_pages)
    }

    /// Index of the first item on the current page
    pub fn offset(&self) -> usize {
        (self.current_page - 1) * self.per_page
    }

    /// Item range of the current page within `total_count`
    pub fn page_range(&self) -> Range<usize> {
        let start = self.offset().min(self.total_count);
        let end = (start + self.per_page).min(self.total_count);
        start..end
    }
}

/// An entry in the page-number strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

/// Page numbers to show around `current`.
///
/// Shows every page when they fit in `max_visible`; otherwise a window
/// starting two pages before `current`, with the first and last page and
/// ellipses added when they are not adjacent to the window.
pub fn page_window(current: usize, total: usize, max_visible: usize) -> Vec<PageItem> {
    let total = total.max(1);
    let max_visible = max_visible.max(1);

    if total <= max_visible {
        return (1..=total).map(PageItem::Page).collect();
    }

    let start = current.saturating_sub(2).max(1);
    let end = (start + max_visible - 1).min(total);
    let mut items = Vec::with_capacity(max_visible + 4);

    if start > 1 {
        items.push(PageItem::Page(1));
        if start > 2 {
            items.push(PageItem::Ellipsis);
        }
    }
    items.extend((start..=end).map(PageItem::Page));
    if end < total {
        if end < total - 1 {
            items.push(PageItem::Ellipsis);
        }
        items.push(PageItem::Page(total));
    }
    items
}
