use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;

/// `skip`/`limit` query parameters shared by every list endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip: Some(skip), limit: Some(limit) }
    }

    pub fn offset(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// PostgREST `offset`/`limit` pair, without a leading separator.
    pub fn to_query(&self) -> String {
        format!("offset={}&limit={}", self.offset(), self.limit())
    }
}
