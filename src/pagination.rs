//! Paged views over the records bound to one popup.
//!
//! A window never wraps around: stepping past either end leaves it where it
//! is. Binding a new list always starts over at page 0.

/// A fixed-size, navigable slice of a record list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageWindow<T> {
    page_index: usize,
    page_count: usize,
    page_size: usize,
    items: Vec<T>,
}

/// Bind `items` to a window of `page_size` items per page, starting on the
/// first page.
///
/// A `page_size` of 0 is treated as 1. An empty list still has one (empty)
/// page.
///
/// # Example
/// ```
/// use spatial_grouping::make_window;
///
/// let window = make_window(vec!["a", "b", "c", "d", "e"], 2);
/// assert_eq!(window.page_count(), 3);
/// assert_eq!(window.page_items(), &["a", "b"]);
///
/// let last = window.next().next().next();
/// assert_eq!(last.page_index(), 2);
/// assert_eq!(last.page_items(), &["e"]);
/// ```
pub fn make_window<T>(items: Vec<T>, page_size: usize) -> PageWindow<T> {
    let page_size = page_size.max(1);
    let page_count = items.len().div_ceil(page_size).max(1);
    PageWindow {
        page_index: 0,
        page_count,
        page_size,
        items,
    }
}

impl<T> PageWindow<T> {
    /// The following page, or the same window on the last page.
    pub fn next(self) -> Self {
        if self.has_next() {
            Self {
                page_index: self.page_index + 1,
                ..self
            }
        } else {
            self
        }
    }

    /// The preceding page, or the same window on the first page.
    pub fn prev(self) -> Self {
        if self.has_prev() {
            Self {
                page_index: self.page_index - 1,
                ..self
            }
        } else {
            self
        }
    }

    /// Replace the bound list, resetting to page 0.
    pub fn rebind(self, items: Vec<T>) -> Self {
        make_window(items, self.page_size)
    }

    /// Items on the current page.
    pub fn page_items(&self) -> &[T] {
        let start = (self.page_index * self.page_size).min(self.items.len());
        let end = (start + self.page_size).min(self.items.len());
        &self.items[start..end]
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn has_next(&self) -> bool {
        self.page_index + 1 < self.page_count
    }

    pub fn has_prev(&self) -> bool {
        self.page_index > 0
    }

    /// Number of items across all pages.
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// The whole bound list.
    pub fn items(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(make_window(vec![1, 2, 3, 4, 5], 2).page_count(), 3);
        assert_eq!(make_window(vec![1, 2, 3, 4], 2).page_count(), 2);
        assert_eq!(make_window(vec![1], 2).page_count(), 1);
    }

    #[test]
    fn test_empty_list_has_one_page() {
        let window: PageWindow<u8> = make_window(vec![], 2);
        assert_eq!(window.page_count(), 1);
        assert!(window.page_items().is_empty());
        assert!(!window.has_next());
        assert_eq!(window.next().page_index(), 0);
    }

    #[test]
    fn test_next_clamps_at_last_page() {
        let mut window = make_window(vec![1, 2, 3, 4, 5], 2);
        let mut seen = Vec::new();
        for _ in 0..3 {
            window = window.next();
            seen.push(window.page_index());
        }
        assert_eq!(seen, vec![1, 2, 2]);
        assert_eq!(window.page_items(), &[5]);
    }

    #[test]
    fn test_prev_clamps_at_first_page() {
        let window = make_window(vec![1, 2, 3, 4, 5], 2);
        let window = window.prev();
        assert_eq!(window.page_index(), 0);
        assert_eq!(window.page_items(), &[1, 2]);

        let back = window.next().next().prev();
        assert_eq!(back.page_index(), 1);
        assert_eq!(back.page_items(), &[3, 4]);
    }

    #[test]
    fn test_rebind_resets_page() {
        let window = make_window(vec![1, 2, 3, 4, 5], 2).next().next();
        assert_eq!(window.page_index(), 2);

        let rebound = window.rebind(vec![10, 20, 30]);
        assert_eq!(rebound.page_index(), 0);
        assert_eq!(rebound.page_count(), 2);
        assert_eq!(rebound.page_size(), 2);
        assert_eq!(rebound.page_items(), &[10, 20]);
    }

    #[test]
    fn test_zero_page_size_is_one() {
        let window = make_window(vec!['a', 'b'], 0);
        assert_eq!(window.page_size(), 1);
        assert_eq!(window.page_count(), 2);
        assert_eq!(window.total(), 2);
    }
}
