//! Pagination utilities for list views
//!
//! Provides a simple `Pagination` struct and helpers to normalize inputs.

/// Upper bound applied when no explicit maximum is configured.
pub const MAX_PER_PAGE: u32 = 1000;

/// Pagination parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    /// items per page
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1),
            per_page: per_page.unwrap_or(default_per_page),
        }
    }

    /// Clamp to sane defaults and convert to a 0-based page index and page size.
    pub fn normalize(self) -> (u64, u64) {
        self.normalize_with_max(MAX_PER_PAGE)
    }

    pub fn normalize_with_max(self, max_per_page: u32) -> (u64, u64) {
        let page = if self.page == 0 { 1 } else { self.page };
        let per_page = self.per_page.clamp(1, max_per_page.max(1));
        ((page - 1) as u64, per_page as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: 1, per_page: 50 } }
}

/// One page of results plus the counters list templates need.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool { self.page < self.total_pages }
    pub fn has_previous(&self) -> bool { self.page > 1 }
}
