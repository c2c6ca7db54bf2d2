use serde::{Deserialize, Serialize};

use super::pager::{PageWindow, Pager};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current: u64,
    pub limit: u64,
    pub records: u64,
    pub pages: u64,
}

/// Response envelope for every search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub pagination: Pagination,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// Combine the pager window, the total count and the mapped rows.
    /// A page past the end is still a valid page with no data.
    pub fn assemble(window: PageWindow, records: u64, data: Vec<T>) -> Self {
        debug_assert!(data.len() as u64 <= window.limit);
        Self {
            pagination: Pagination {
                current: window.page,
                limit: window.limit,
                records,
                pages: Pager::pages(records, window.limit),
            },
            data,
        }
    }
}
