//! Pagination types.

use serde::{Deserialize, Serialize};

/// Default page size.
pub const DEFAULT_LIMIT: i64 = 20;

/// Largest page size a caller may request.
pub const MAX_LIMIT: i64 = 100;

/// A request for one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Current page (1-indexed).
    pub page: i64,
    /// Items per page.
    pub limit: i64,
}

impl PageRequest {
    /// Create a page request, clamping out-of-range values.
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Build a request from optional query parameters.
    pub fn from_params(page: Option<i64>, limit: Option<i64>) -> Self {
        Self::new(page.unwrap_or(1), limit.unwrap_or(DEFAULT_LIMIT))
    }

    /// Get the row offset for this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_LIMIT)
    }
}

/// Pagination information returned with a page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    /// Current page (1-indexed).
    pub page: i64,
    /// Items per page.
    pub limit: i64,
    /// Total number of items.
    pub total: i64,
    /// Total number of pages.
    pub total_pages: i64,
    /// Whether there's a next page.
    pub has_next: bool,
    /// Whether there's a previous page.
    pub has_prev: bool,
}

impl Pagination {
    /// Create pagination info.
    pub fn new(request: PageRequest, total: i64) -> Self {
        let total_pages = if total == 0 {
            1
        } else {
            (total + request.limit - 1) / request.limit
        };

        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
        }
    }
}

/// A page of items with its pagination info.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Pagination info.
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Transform the items while keeping the pagination info.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_saturates_on_huge_page() {
        let req = PageRequest::from_params(Some(i64::MAX), Some(20));
        assert_eq!(req.page, i64::MAX);
        assert_eq!(req.offset(), i64::MAX);

        let req = PageRequest::new(3, 20);
        assert_eq!(req.offset(), 40);
    }

    #[test]
    fn test_page_request_clamps() {
        let req = PageRequest::new(0, 1000);
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, MAX_LIMIT);

        let req = PageRequest::from_params(None, None);
        assert_eq!(req.limit, DEFAULT_LIMIT);
        assert_eq!(req.offset(), 0);

        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_pagination() {
        let p = Pagination::new(PageRequest::new(2, 10), 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);

        let p = Pagination::new(PageRequest::new(1, 10), 0);
        assert_eq!(p.total_pages, 1);
        assert!(!p.has_next);
        assert!(!p.has_prev);
    }
}
