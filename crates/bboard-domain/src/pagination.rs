//! Page-number pagination over a counted result set.

/// Splits a result set of `count` items into fixed-size, 1-indexed pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: u64,
}

impl Paginator {
    /// `per_page` is clamped to at least 1.
    pub fn new(per_page: u64) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Number of pages for `count` items. An empty set still has one page.
    pub fn num_pages(&self, count: u64) -> u64 {
        if count == 0 {
            1
        } else {
            count.div_ceil(self.per_page)
        }
    }

    /// Resolve a raw `page` query value against `count` items.
    ///
    /// - absent or non-numeric → first page
    /// - below 1 or past the end → last page
    pub fn get_page(&self, raw: Option<&str>, count: u64) -> Page {
        let num_pages = self.num_pages(count);
        let number = match raw.map(str::trim).map(str::parse::<i64>) {
            None | Some(Err(_)) => 1,
            Some(Ok(n)) if n < 1 || n as u64 > num_pages => num_pages,
            Some(Ok(n)) => n as u64,
        };
        Page {
            number,
            num_pages,
            per_page: self.per_page,
            count,
        }
    }
}

/// A resolved page: which slice of the result set to fetch and how to link around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub num_pages: u64,
    pub per_page: u64,
    pub count: u64,
}

impl Page {
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    /// Number of items on this page.
    pub fn len(&self) -> u64 {
        self.count
            .saturating_sub(self.offset())
            .min(self.per_page)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> u64 {
        self.number + 1
    }

    pub fn previous_page_number(&self) -> u64 {
        self.number.saturating_sub(1).max(1)
    }
}
