//! Query builders over the entities. Every function is generic over
//! `ConnectionTrait` so callers decide whether it runs on the pool or inside
//! a transaction. Nothing here commits.

pub mod orders;
pub mod products;

/// One-based page request, clamped to sane bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub page_size: u64,
}

impl Page {
    pub const MAX_PAGE_SIZE: u64 = 100;
    /// Highest page whose row offset still fits a signed 64-bit OFFSET.
    pub const MAX_PAGE: u64 = i64::MAX as u64 / Self::MAX_PAGE_SIZE;

    /// Clamps `page` to `1..=MAX_PAGE` and `page_size` to `1..=100`.
    pub fn new(page: Option<i64>, page_size: Option<i64>, default_size: u64) -> Page {
        let page = (page.unwrap_or(1).max(1) as u64).min(Self::MAX_PAGE);
        let page_size = page_size
            .map(|size| size.clamp(1, Self::MAX_PAGE_SIZE as i64) as u64)
            .unwrap_or_else(|| default_size.clamp(1, Self::MAX_PAGE_SIZE));
        Page { page, page_size }
    }

    /// Zero-based page index as the paginator expects it.
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}
