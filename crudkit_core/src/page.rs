//! Pagination arithmetic and the page descriptor / search result types.
//!
//! The functions here are pure: offset and limit are always derived from
//! `(page, page_size)` via the same formulas, and `total_pages` satisfies
//! `total_pages == ceil(total_count / page_size)` whenever `page_size > 0`.

use serde::{Deserialize, Serialize};

/// Sentinel meaning "unbounded" for offset and limit values handed to backends.
pub const UNBOUNDED: i64 = -1;

/// Offset for a 1-based page. `page == 0` means "no pagination" and yields
/// the unbounded sentinel.
pub fn offset(page: u32, page_size: u32) -> i64 {
    if page == 0 {
        return UNBOUNDED;
    }
    i64::from(page_size) * (i64::from(page) - 1)
}

/// Limit for a page size. `page_size == 0` means "no limit" and yields the
/// unbounded sentinel.
pub fn limit(page_size: u32) -> i64 {
    if page_size == 0 {
        return UNBOUNDED;
    }
    i64::from(page_size)
}

/// Total page count via integer ceiling division.
///
/// `page_size == 0` is guarded explicitly instead of dividing by zero: the
/// whole result set is one unbounded page (zero pages when it is empty).
pub fn total_pages(total_count: i64, page_size: u32) -> i64 {
    if page_size == 0 {
        return if total_count > 0 { 1 } else { 0 };
    }
    let ps = i64::from(page_size);
    (total_count + ps - 1) / ps
}

/// Whether rows exist past the given page. With the unbounded limit sentinel
/// there is a single page, so no next page.
pub fn has_next_page(page: u32, limit: i64, total_count: i64) -> bool {
    limit > 0 && i64::from(page) * limit < total_count
}

/// Whether a previous page exists.
pub fn has_prev_page(page: u32) -> bool {
    page > 1
}

/// Request parameters for a paginated search. Passed per call; the repository
/// holds no pagination state between searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number, 1-based. `0` means "no pagination / fetch all".
    pub page: u32,
    /// Items per page. `0` means "no limit".
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// A request that fetches everything in one unbounded page.
    pub fn all() -> Self {
        Self {
            page: 0,
            page_size: 0,
        }
    }

    /// The derived offset handed to the backend.
    pub fn offset(&self) -> i64 {
        offset(self.page, self.page_size)
    }

    /// The derived limit handed to the backend.
    pub fn limit(&self) -> i64 {
        limit(self.page_size)
    }
}

/// One page of search results plus the totals derived from the row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub entities: Vec<T>,
    /// Total row count matching the filter, independent of pagination.
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> Page<T> {
    /// Derive the page totals from a request and the filtered row count.
    pub fn assemble(entities: Vec<T>, request: &PageRequest, total_count: i64) -> Self {
        Self {
            entities,
            total_count,
            page: request.page,
            page_size: request.page_size,
            total_pages: total_pages(total_count, request.page_size),
            has_next_page: has_next_page(request.page, request.limit(), total_count),
            has_prev_page: has_prev_page(request.page),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
