//! Page-number pagination over newest-first listings.

use crate::error::{AppError, Result};
use serde::Serialize;

/// A requested page, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Build a request, clamping missing or zero page numbers to 1.
    /// `page_size` must be within `1..=max_page_size`.
    pub fn new(page: Option<u32>, page_size: u32, max_page_size: u32) -> Result<Self> {
        if page_size == 0 || page_size > max_page_size {
            return Err(AppError::Validation(format!(
                "page size must be between 1 and {}",
                max_page_size
            )));
        }

        Ok(Self {
            page: page.unwrap_or(1).max(1),
            page_size,
        })
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}

/// One page of a listing plus the metadata needed to navigate it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: u64,
    pub num_pages: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, count: i64, request: PageRequest) -> Self {
        let count = count.max(0) as u64;
        let num_pages = num_pages(count, request.page_size);
        let page = u64::from(request.page);

        Self {
            items,
            count,
            num_pages,
            page: request.page,
            page_size: request.page_size,
            has_next: page < num_pages,
            has_previous: page > 1 && num_pages > 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// ceil(count / page_size); an empty source has zero pages
pub fn num_pages(count: u64, page_size: u32) -> u64 {
    let size = u64::from(page_size.max(1));
    count.div_ceil(size)
}
