//! Core engine for the content feed.
//! Owns the content-type abstraction, feed/reaction aggregation and
//! notification fan-out; collaborators are consumed through narrow traits.

pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod query;
pub mod registry;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use context::{ContextError, CoreContext};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::content::{
    AccountId, ContentChanges, ContentDraft, ContentId, ContentItem, ContentKind, ContentRef,
    RealmId,
};
pub use model::directory::{Account, Category, Membership, Realm, Tag};
pub use model::feed::{AuthorSnapshot, ContentMetrics, FeedItem, FeedPage};
pub use model::reaction::{Attitude, AttitudeTotals, Reaction, ToggleOutcome};
pub use notify::{
    DeliveryError, FanoutStats, LogNotificationSink, Notification, NotificationFanout,
    NotificationLink, NotificationSink, SqliteOutboxSink,
};
pub use query::{FilterPipeline, PageRequest, SortDirection};
pub use registry::{resolve, ContentTypeDescriptor, RegistryError};
pub use repo::directory_repo::{AccountStore, Directory, FollowStore, RealmStore, SqliteDirectory};
pub use repo::{RepoError, RepoResult};
pub use service::{
    ContentService, FeedScope, FeedService, ReactionAggregator, ReactionService, ServiceError,
    ServiceResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
