//! Query building over registry descriptors.
//!
//! # Responsibility
//! - Compose parameterized WHERE/ORDER BY fragments for one content table.
//! - Own the pagination contract shared by every list operation.
//!
//! # Invariants
//! - Identifiers come from descriptors; values are always bound.
//! - Page size is clamped to `MAX_TAKE`.

pub mod filter;
pub mod page;

pub use filter::FilterPipeline;
pub use page::{normalize_take, PageRequest, SortDirection, DEFAULT_TAKE, MAX_TAKE};
