//! Pagination and ordering primitives.

use serde::{Deserialize, Serialize};

/// Page size used when the caller omits `take` or passes zero.
pub const DEFAULT_TAKE: u32 = 10;
/// Hard cap on page size.
pub const MAX_TAKE: u32 = 20;

/// Normalizes a requested page size into `1..=MAX_TAKE`.
pub fn normalize_take(take: Option<u32>) -> u32 {
    match take {
        Some(0) | None => DEFAULT_TAKE,
        Some(value) if value > MAX_TAKE => MAX_TAKE,
        Some(value) => value,
    }
}

/// `take`/`offset` pair accepted by list operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub take: Option<u32>,
    /// Zero-based row offset.
    pub offset: u32,
}

impl PageRequest {
    pub fn new(take: Option<u32>, offset: u32) -> Self {
        Self { take, offset }
    }

    /// Effective page size after clamping.
    pub fn applied_limit(&self) -> u32 {
        normalize_take(self.take)
    }
}

/// Ordering on `created_at`; ties are broken by id in the same direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}
