//! Offset pagination for chat-sized pages.
//!
//! The bot pages through results with inline buttons that carry a zero-based
//! page number, so plain `OFFSET/LIMIT` is all that is needed.

/// Default number of requests per page.
pub const PAGE_SIZE: i64 = 5;

/// A zero-based page of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Negative pages clamp to 0, page size clamps to 1..=100.
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.max(0),
            page_size: page_size.clamp(1, 100),
        }
    }

    pub fn first(page_size: i64) -> Self {
        Self::new(0, page_size)
    }

    /// Saturates instead of overflowing; an offset past the end of the
    /// table just returns no rows.
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// Total pages for `total` items (ceil division, 0 for an empty set).
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            total / self.page_size + i64::from(total % self.page_size != 0)
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self, total: i64) -> bool {
        self.page
            .saturating_add(1)
            .saturating_mul(self.page_size)
            < total
    }

    pub fn previous(&self) -> Self {
        Self::new(self.page.saturating_sub(1), self.page_size)
    }

    pub fn next(&self) -> Self {
        Self::new(self.page.saturating_add(1), self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_page() {
        assert_eq!(PageRequest::new(0, 5).offset(), 0);
        assert_eq!(PageRequest::new(3, 5).offset(), 15);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = PageRequest::first(5);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(1), 1);
        assert_eq!(page.total_pages(5), 1);
        assert_eq!(page.total_pages(6), 2);
    }

    #[test]
    fn navigation_flags() {
        let first = PageRequest::new(0, 5);
        assert!(!first.has_previous());
        assert!(first.has_next(6));
        assert!(!first.has_next(5));

        let second = first.next();
        assert!(second.has_previous());
        assert!(!second.has_next(10));
        assert_eq!(second.previous(), first);
    }

    #[test]
    fn huge_pages_do_not_overflow() {
        let last = PageRequest::new(i64::MAX, 5);
        assert_eq!(last.offset(), i64::MAX);
        assert!(!last.has_next(i64::MAX));
        assert_eq!(last.next(), last);
        assert_eq!(PageRequest::new(i64::MAX / 2, 100).offset(), i64::MAX);
        assert_eq!(PageRequest::first(5).total_pages(i64::MAX), i64::MAX / 5 + 1);
    }

    #[test]
    fn bounds_are_clamped() {
        assert_eq!(PageRequest::new(-3, 0), PageRequest { page: 0, page_size: 1 });
        assert_eq!(PageRequest::new(1, 1_000).page_size, 100);
    }
}
