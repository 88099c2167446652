//! Reaction domain model.
//!
//! # Invariants
//! - At most one reaction per (account, content item, symbol).
//! - Reactions have no edit path; presence is the reacted state.

use crate::model::content::{AccountId, ContentRef};
use serde::{Deserialize, Serialize};

pub type ReactionId = i64;

/// Polarity attached to a reaction symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attitude {
    Positive,
    Negative,
}

impl Attitude {
    /// Stable storage value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }

    /// Parses a storage value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }
}

/// One persisted reaction row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: ReactionId,
    pub account_id: AccountId,
    pub symbol: String,
    pub attitude: Attitude,
    pub target: ContentRef,
    pub created_at: i64,
}

/// Result of a toggle request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    /// `true` when the reaction is present after the call.
    pub created: bool,
    /// The inserted row, or the row that was removed.
    pub reaction: Reaction,
}

/// Positive/negative split for one content item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttitudeTotals {
    pub positive: i64,
    pub negative: i64,
}

impl AttitudeTotals {
    pub fn total(&self) -> i64 {
        self.positive + self.negative
    }
}
