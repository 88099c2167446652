//! Domain model for content items, reactions and derived feed projections.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one content-item shape for articles, moments and comments.
//!
//! # Invariants
//! - Content identity is `(ContentKind, ContentId)`; ids are per table.
//! - Feed items and metrics are derived per request and never stored.

pub mod content;
pub mod directory;
pub mod feed;
pub mod reaction;
