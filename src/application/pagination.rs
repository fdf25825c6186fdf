//! Page-number pagination over ordered result sets.
//!
//! Page numbers are 1-based. A missing or non-numeric request resolves to the
//! first page, anything below 1 clamps to the first page, and anything past
//! the end clamps to the last page. An empty result set still has exactly one
//! (empty) page so templates never need a special case.

use std::num::NonZeroU32;

use serde::Serialize;

/// Parsed `?page=` value before it is clamped against a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    Number(i64),
    Invalid,
}

impl PageNumber {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) => value
                .parse::<i64>()
                .map(PageNumber::Number)
                .unwrap_or(PageNumber::Invalid),
            None => PageNumber::Invalid,
        }
    }
}

/// The slice of a result set that one page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub offset: u64,
    pub limit: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: NonZeroU32,
}

impl Paginator {
    pub fn new(per_page: NonZeroU32) -> Self {
        Self { per_page }
    }

    pub fn per_page(&self) -> u64 {
        u64::from(self.per_page.get())
    }

    pub fn num_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.per_page()).max(1)
    }

    pub fn window(&self, total: u64, requested: PageNumber) -> PageWindow {
        let num_pages = self.num_pages(total);
        let number = match requested {
            PageNumber::Invalid => 1,
            PageNumber::Number(n) if n < 1 => 1,
            PageNumber::Number(n) => (n as u64).min(num_pages),
        };
        let offset = (number - 1) * self.per_page();
        let limit = self.per_page().min(total.saturating_sub(offset));
        PageWindow {
            number,
            num_pages,
            offset,
            limit,
            total,
        }
    }

    /// Slice an in-memory, already ordered sequence.
    pub fn paginate<T>(&self, items: Vec<T>, requested: PageNumber) -> Page<T> {
        let window = self.window(items.len() as u64, requested);
        let slice = items
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .collect();
        Page::new(slice, window)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            total: window.total,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_other_pages(&self) -> bool {
        self.num_pages > 1
    }

    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then_some(self.number - 1)
    }
}
