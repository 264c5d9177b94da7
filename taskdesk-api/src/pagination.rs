//! Pagination utilities for list endpoints

use taskdesk_common::api::PageMeta;

/// Page size when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Validated `page` / `limit` pair (1-indexed page)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Offset for SQL LIMIT/OFFSET query
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Calculate pagination metadata from total results and the requested page
///
/// Pages past the end are not clamped: they simply come back empty.
///
/// # Examples
/// ```
/// use taskdesk_api::pagination::{calculate_pagination, PageRequest};
///
/// // 45 total results at 20 per page = 3 pages (20 + 20 + 5)
/// let meta = calculate_pagination(45, PageRequest { page: 2, limit: 20 });
/// assert_eq!(meta.page, 2);
/// assert_eq!(meta.total_pages, 3);
/// ```
pub fn calculate_pagination(total_results: i64, request: PageRequest) -> PageMeta {
    let total_pages = (total_results + request.limit - 1) / request.limit;

    PageMeta {
        page: request.page,
        limit: request.limit,
        total: total_results,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let meta = calculate_pagination(250, PageRequest { page: 2, limit: 100 });
        assert_eq!(meta.page, 2);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.total, 250);
    }

    #[test]
    fn test_pagination_exact_multiple() {
        let meta = calculate_pagination(40, PageRequest { page: 1, limit: 20 });
        assert_eq!(meta.total_pages, 2);
    }

    #[test]
    fn test_pagination_empty() {
        let meta = calculate_pagination(0, PageRequest::default());
        assert_eq!(meta.total_pages, 0);
        assert_eq!(meta.page, 1);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest { page: 1, limit: 20 }.offset(), 0);
        assert_eq!(PageRequest { page: 3, limit: 25 }.offset(), 50);
        assert_eq!(PageRequest { page: i64::MAX, limit: 100 }.offset(), i64::MAX);
    }

    #[test]
    fn test_page_past_end_is_not_clamped() {
        let meta = calculate_pagination(5, PageRequest { page: 9, limit: 20 });
        assert_eq!(meta.page, 9);
        assert_eq!(meta.total_pages, 1);
    }
}
