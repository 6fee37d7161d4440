// Catalog
pub mod products;
pub mod schools;

// Order engine
pub mod orders;

// Corporate sales
pub mod inquiries;

#[cfg(test)]
pub(crate) mod test_support;

pub const DEFAULT_PAGE: u64 = 1;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Page selection taken from `page`/`limit` query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// One-based page, limit clamped to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: Option<u64>, limit: Option<u64>, default_limit: u64) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Zero-based index for `Paginator::fetch_page`
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}

/// One page of results plus the totals needed for the envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
        }
    }

    pub fn pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}
