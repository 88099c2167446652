//! Reaction toggle use-cases.
//!
//! # Responsibility
//! - Toggle one (account, item, symbol) reaction on or off.
//! - Expose per-item reaction counts and breakdowns.
//! - Report reactions left dangling by deleted items.
//!
//! # Invariants
//! - Presence alone decides the toggle direction; the new attitude is
//!   ignored when removing.
//! - A lost insert race reports `created = true` with the winning row.

use crate::db::now_epoch_ms;
use crate::model::content::{AccountId, ContentId, ContentRef};
use crate::model::reaction::{Attitude, ToggleOutcome};
use crate::registry::resolve;
use crate::repo::content_repo::{ContentRepository, SqliteContentRepository};
use crate::repo::reaction_repo::{ReactionRepository, SqliteReactionRepository};
use crate::repo::RepoError;
use crate::service::aggregator::ReactionAggregator;
use crate::service::error::{ServiceError, ServiceResult};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::collections::BTreeMap;

static SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]{1,32}$").expect("valid reaction symbol regex"));

/// Toggle facade over reaction storage.
pub struct ReactionService<'conn> {
    conn: &'conn Connection,
    aggregator: ReactionAggregator<'conn>,
}

impl<'conn> ReactionService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            aggregator: ReactionAggregator::new(conn),
        }
    }

    /// Adds the reaction when absent, removes it when present.
    pub fn toggle_reaction(
        &self,
        account_id: AccountId,
        type_name: &str,
        content_id: ContentId,
        symbol: &str,
        attitude: Attitude,
    ) -> ServiceResult<ToggleOutcome> {
        let descriptor = resolve(type_name)?;
        let symbol = normalize_symbol(symbol).ok_or_else(|| {
            ServiceError::ValidationFailed(format!("invalid reaction symbol `{symbol}`"))
        })?;

        let tx = self.conn.unchecked_transaction()?;
        if !SqliteContentRepository::new(&tx).content_exists(descriptor, content_id)? {
            return Err(ServiceError::not_found(descriptor.model_type, content_id));
        }

        let target = ContentRef::new(descriptor.kind, content_id);
        let outcome = apply_toggle(
            &SqliteReactionRepository::new(&tx),
            account_id,
            target,
            &symbol,
            attitude,
        )?;
        tx.commit()?;

        info!(
            "event=reaction_toggle module=service status=ok model_type={} id={} account_id={} created={}",
            descriptor.model_type, content_id, account_id, outcome.created
        );
        Ok(outcome)
    }

    /// Total reactions on one item across all symbols.
    pub fn count_reactions(&self, type_name: &str, id: ContentId) -> ServiceResult<i64> {
        Ok(self.list_reaction_breakdown(type_name, id)?.values().sum())
    }

    /// Symbol -> count for one item; empty when nobody reacted.
    pub fn list_reaction_breakdown(
        &self,
        type_name: &str,
        id: ContentId,
    ) -> ServiceResult<BTreeMap<String, i64>> {
        let descriptor = resolve(type_name)?;
        Ok(self
            .aggregator
            .tally(descriptor, &[id])?
            .remove(&id)
            .unwrap_or_default())
    }

    /// Reactions whose target row of this type no longer exists.
    pub fn count_dangling_reactions(&self, type_name: &str) -> ServiceResult<i64> {
        let descriptor = resolve(type_name)?;
        Ok(SqliteReactionRepository::new(self.conn).count_dangling(descriptor)?)
    }
}

/// Removes an existing reaction or inserts a new one.
///
/// When the insert loses a race on the unique key, the row that won is
/// returned as created.
fn apply_toggle<R: ReactionRepository>(
    reactions: &R,
    account_id: AccountId,
    target: ContentRef,
    symbol: &str,
    attitude: Attitude,
) -> ServiceResult<ToggleOutcome> {
    if let Some(existing) = reactions.find_reaction(account_id, target, symbol)? {
        reactions.delete_reaction(existing.id)?;
        return Ok(ToggleOutcome {
            created: false,
            reaction: existing,
        });
    }

    match reactions.insert_reaction(account_id, target, symbol, attitude, now_epoch_ms()) {
        Ok(reaction) => Ok(ToggleOutcome {
            created: true,
            reaction,
        }),
        Err(RepoError::Conflict(key)) => {
            let winner = reactions
                .find_reaction(account_id, target, symbol)?
                .ok_or(ServiceError::ValidationFailed(format!(
                    "reaction conflict without a stored row: {key}"
                )))?;
            Ok(ToggleOutcome {
                created: true,
                reaction: winner,
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Trims and lowercases a symbol; `None` when the result is not accepted.
pub fn normalize_symbol(symbol: &str) -> Option<String> {
    let normalized = symbol.trim().to_lowercase();
    SYMBOL_RE.is_match(&normalized).then_some(normalized)
}
