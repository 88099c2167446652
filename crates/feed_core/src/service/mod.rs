//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into feed, content and reaction APIs.
//! - Map persistence failures into the caller-facing `ServiceError` taxonomy.

pub mod aggregator;
pub mod content_service;
pub mod error;
pub mod feed_service;
pub mod reaction_service;

pub use aggregator::ReactionAggregator;
pub use content_service::ContentService;
pub use error::{ServiceError, ServiceResult};
pub use feed_service::{FeedScope, FeedService};
pub use reaction_service::ReactionService;
