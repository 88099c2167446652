//! Records owned by external collaborators (accounts, realms, taxonomy).
//!
//! The core reads these by id or alias and never mutates them, except for
//! tag get-or-create.

use crate::model::content::{AccountId, RealmId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Unique handle.
    pub name: String,
    /// Display name.
    pub nick: String,
    pub avatar: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realm {
    pub id: RealmId,
    pub alias: String,
    pub name: String,
    /// Non-public realms require a membership row to post into.
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub realm_id: RealmId,
    pub account_id: AccountId,
    pub power_level: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub alias: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub alias: String,
    pub name: String,
}
