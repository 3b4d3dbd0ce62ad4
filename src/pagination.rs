use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// `?limit=&offset=` query parameters for chat and message lists.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// How many rows to ask the source for, so that `has_more` is exact.
    pub fn fetch_limit(&self) -> i64 {
        self.limit() + 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageInfo {
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
    pub next_offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Page<T> {
    /// Builds a page from up to `fetch_limit()` rows, trimming the probe row.
    pub fn from_probe(mut items: Vec<T>, params: &PageParams) -> Self {
        let limit = params.limit();
        let offset = params.offset();
        let has_more = items.len() as i64 > limit;
        items.truncate(limit as usize);

        Page {
            items,
            pagination: PageInfo {
                limit,
                offset,
                has_more,
                next_offset: has_more.then_some(offset + limit),
            },
        }
    }
}
