//! Content item domain model.
//!
//! # Responsibility
//! - Define the canonical record shared by article/moment/comment variants.
//! - Define create/edit request shapes consumed by the mutation service.
//!
//! # Invariants
//! - `published_at = None` means draft; items are visible only once
//!   `published_at <= now`.
//! - `parent` is set for comments only and names exactly one parent item.
//! - `reply_id`/`repost_id` reference rows of the same content table.

use serde::{Deserialize, Serialize};

/// Integer identity of a content row inside its own table.
pub type ContentId = i64;
/// Integer identity of an account owned by the account store.
pub type AccountId = i64;
/// Integer identity of a realm owned by the realm store.
pub type RealmId = i64;

/// Logical content variant. Each variant maps to one registry descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Long-form post with title and optional description.
    Article,
    /// Short post; may repost another moment.
    Moment,
    /// Attached to exactly one article, moment or comment.
    Comment,
}

impl ContentKind {
    /// All variants in registry order.
    pub const ALL: [ContentKind; 3] = [Self::Article, Self::Moment, Self::Comment];
}

/// Typed reference to one content row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef {
    pub kind: ContentKind,
    pub id: ContentId,
}

impl ContentRef {
    pub fn new(kind: ContentKind, id: ContentId) -> Self {
        Self { kind, id }
    }
}

/// Canonical content record, hydrated with its join-table sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    /// Serialized as `type` to match the public selector naming.
    #[serde(rename = "type")]
    pub kind: ContentKind,
    /// Opaque public slug, unique per content table.
    pub alias: String,
    /// Articles only.
    pub title: Option<String>,
    /// Articles only.
    pub description: Option<String>,
    pub content: String,
    pub author_id: AccountId,
    pub realm_id: Option<RealmId>,
    /// Unix epoch milliseconds; `None` for drafts.
    pub published_at: Option<i64>,
    pub reply_id: Option<ContentId>,
    pub repost_id: Option<ContentId>,
    /// Comments only.
    pub parent: Option<ContentRef>,
    /// Attachment ids in display order.
    pub attachments: Vec<String>,
    /// Category aliases, sorted.
    pub categories: Vec<String>,
    /// Tag aliases, sorted.
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ContentItem {
    /// Typed reference to this row.
    pub fn as_ref(&self) -> ContentRef {
        ContentRef::new(self.kind, self.id)
    }

    /// Returns whether this item has no publish time.
    pub fn is_draft(&self) -> bool {
        self.published_at.is_none()
    }

    /// Returns whether this item is visible at `now` (epoch ms).
    pub fn is_published_at(&self, now: i64) -> bool {
        matches!(self.published_at, Some(at) if at <= now)
    }
}

/// Create request for one content item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentDraft {
    /// Generated when absent.
    pub alias: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: String,
    pub realm_id: Option<RealmId>,
    /// Defaults to now unless `draft` is set.
    pub published_at: Option<i64>,
    /// Persist without publish time.
    pub draft: bool,
    pub reply_to: Option<ContentId>,
    pub repost_to: Option<ContentId>,
    /// Required for comments, rejected for other variants.
    pub parent: Option<ContentRef>,
    /// Category aliases; every alias must already exist.
    pub categories: Vec<String>,
    /// Tag aliases; missing tags are created.
    pub tags: Vec<String>,
    pub attachments: Vec<String>,
}

/// Edit request for one content item. Realm and references are immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentChanges {
    /// Keeps the current alias when absent.
    pub alias: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: String,
    pub published_at: Option<i64>,
    pub draft: bool,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub attachments: Vec<String>,
}
