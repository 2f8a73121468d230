//! Paging types: zero-based page requests and page results.

use serde::{Deserialize, Serialize};

/// A request for one page of results.
///
/// Pages are zero-indexed: page 0 is the first page and the skip count is
/// `index * size`. Sizes are not capped; callers are responsible for sane
/// paging.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// The page index (0-indexed).
    pub index: usize,
    /// Number of items per page.
    pub size: usize,
}

impl PageRequest {
    /// Creates a new page request.
    pub fn new(index: usize, size: usize) -> Self {
        Self { index, size }
    }

    /// Calculates the number of items to skip for this page.
    pub fn offset(&self) -> usize {
        self.index * self.size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { index: 0, size: 10 }
    }
}

/// A single page of results with navigation metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items contained in this page.
    pub items: Vec<T>,
    /// Total count of items across all pages.
    pub total: u64,
    /// The next page index (if more pages exist).
    pub next_page: Option<usize>,
    /// The previous page index (if this is not the first page).
    pub previous_page: Option<usize>,
}

impl<T> Page<T> {
    /// Assembles a page from already-fetched items, the total match count,
    /// and the request that produced them.
    pub fn assemble(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let consumed = (request.offset() + items.len()) as u64;

        Self {
            items,
            total,
            next_page: if consumed < total {
                Some(request.index + 1)
            } else {
                None
            },
            previous_page: request.index.checked_sub(1),
        }
    }

    /// Returns `true` when this page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            next_page: None,
            previous_page: None,
        }
    }
}
