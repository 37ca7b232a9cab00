//! View-level windowing over the collection.

use serde::{Deserialize, Serialize};

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Current page and page size. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginator {
    pub page: usize,
    pub page_size: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    /// First page with the given size (a size of 0 is treated as 1).
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Move to `page` (clamped to at least 1).
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Change the page size and go back to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    /// Index of the first row on the current page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Number of pages needed for `total` rows (at least 1).
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size.max(1)).max(1)
    }

    /// Rows on the current page. Empty when the page is past the end.
    pub fn window<'a, T>(&self, records: &'a [T]) -> &'a [T] {
        let start = self.offset().min(records.len());
        let end = start.saturating_add(self.page_size).min(records.len());
        &records[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_first_page() {
        let paginator = Paginator::default();
        assert_eq!(paginator.page, 1);
        assert_eq!(paginator.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn window_slices_current_page() {
        let rows: Vec<u32> = (0..25).collect();
        let mut paginator = Paginator::new(10);

        assert_eq!(paginator.window(&rows), &rows[0..10]);

        paginator.set_page(3);
        assert_eq!(paginator.window(&rows), &rows[20..25]);

        paginator.set_page(4);
        assert!(paginator.window(&rows).is_empty());
    }

    #[test]
    fn page_count_rounds_up() {
        let paginator = Paginator::new(10);
        assert_eq!(paginator.page_count(0), 1);
        assert_eq!(paginator.page_count(10), 1);
        assert_eq!(paginator.page_count(11), 2);
    }

    #[test]
    fn zero_values_are_clamped() {
        let mut paginator = Paginator::new(0);
        assert_eq!(paginator.page_size, 1);

        paginator.set_page(0);
        assert_eq!(paginator.page, 1);

        paginator.set_page(4);
        paginator.set_page_size(0);
        assert_eq!(paginator.page_size, 1);
        assert_eq!(paginator.page, 1);
    }
}
