//! Derived read models: feed items, pages and per-item metrics.
//!
//! Nothing here is persisted; every value is rebuilt per request.

use crate::model::content::{AccountId, ContentId, ContentKind, RealmId};
use crate::model::directory::Account;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Author identity embedded in feed items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSnapshot {
    pub id: AccountId,
    pub name: String,
    pub nick: String,
    pub avatar: Option<String>,
}

impl From<&Account> for AuthorSnapshot {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            nick: account.nick.clone(),
            avatar: account.avatar.clone(),
        }
    }
}

/// Homogeneous projection of one content row for list display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: ContentId,
    pub alias: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub model_type: ContentKind,
    pub author: AuthorSnapshot,
    pub realm_id: Option<RealmId>,
    pub published_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub comment_count: i64,
    pub reaction_count: i64,
    /// Symbol -> count. Empty when reaction hydration was skipped.
    pub reaction_list: BTreeMap<String, i64>,
}

/// One page of feed items plus the unpaginated total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPage {
    pub total: i64,
    /// Effective page size after clamping.
    pub applied_limit: u32,
    pub items: Vec<FeedItem>,
}

impl FeedPage {
    pub fn empty(applied_limit: u32) -> Self {
        Self {
            total: 0,
            applied_limit,
            items: Vec::new(),
        }
    }
}

/// Derived counters for one content item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub reaction_count: i64,
    pub positive_count: i64,
    pub negative_count: i64,
    pub comment_count: i64,
    pub reply_count: i64,
    pub repost_count: i64,
    pub reaction_list: BTreeMap<String, i64>,
}
