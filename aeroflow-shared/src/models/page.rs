use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Page/limit pair taken from list query strings. Pages are 1-based.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> usize {
        ((self.page - 1) as usize) * self.limit as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of a filtered listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: usize,
    pub total: usize,
    pub page: u32,
    pub pages: u32,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Slice an already filtered and sorted result set.
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let items: Vec<T> = all
            .into_iter()
            .skip(request.offset())
            .take(request.limit as usize)
            .collect();
        Self::assemble(items, total, request)
    }

    pub fn assemble(items: Vec<T>, total: usize, request: PageRequest) -> Self {
        let pages = total.div_ceil(request.limit as usize) as u32;
        Self {
            count: items.len(),
            total,
            page: request.page,
            pages,
            items,
        }
    }
}
