//! Reaction repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Presence lookups, inserts and deletes for the toggle service.
//! - Grouped tallies for the aggregator.
//!
//! # Invariants
//! - Every query is scoped to the descriptor's FK column.
//! - Tallies join the owning content table, so rows whose item was deleted
//!   (dangling references) are never counted.
//! - A duplicate (account, item, symbol) insert surfaces as `Conflict`.

use crate::model::content::{AccountId, ContentId, ContentRef};
use crate::model::reaction::{Attitude, AttitudeTotals, Reaction, ReactionId};
use crate::registry::{descriptor_for, descriptors, ContentTypeDescriptor};
use crate::repo::{is_unique_violation, placeholders, RepoError, RepoResult};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::{BTreeMap, HashMap};

/// Symbol counts per content id.
pub type ReactionTally = HashMap<ContentId, BTreeMap<String, i64>>;

/// Repository interface for reaction rows.
pub trait ReactionRepository {
    fn find_reaction(
        &self,
        account_id: AccountId,
        target: ContentRef,
        symbol: &str,
    ) -> RepoResult<Option<Reaction>>;
    fn insert_reaction(
        &self,
        account_id: AccountId,
        target: ContentRef,
        symbol: &str,
        attitude: Attitude,
        now: i64,
    ) -> RepoResult<Reaction>;
    fn delete_reaction(&self, id: ReactionId) -> RepoResult<()>;
    fn tally(&self, descriptor: &ContentTypeDescriptor, ids: &[ContentId])
        -> RepoResult<ReactionTally>;
    fn attitude_totals(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
    ) -> RepoResult<AttitudeTotals>;
    /// Counts reactions whose target row no longer exists.
    fn count_dangling(&self, descriptor: &ContentTypeDescriptor) -> RepoResult<i64>;
}

/// SQLite-backed reaction repository.
pub struct SqliteReactionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReactionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

const REACTION_COLUMNS: &str =
    "id, account_id, symbol, attitude, article_id, moment_id, comment_id, created_at";

impl ReactionRepository for SqliteReactionRepository<'_> {
    fn find_reaction(
        &self,
        account_id: AccountId,
        target: ContentRef,
        symbol: &str,
    ) -> RepoResult<Option<Reaction>> {
        let fk = descriptor_for(target.kind).fk_column;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REACTION_COLUMNS}
             FROM reactions
             WHERE account_id = ?1 AND {fk} = ?2 AND symbol = ?3;"
        ))?;
        let mut rows = stmt.query(params![account_id, target.id, symbol])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_reaction_row(row)?));
        }
        Ok(None)
    }

    fn insert_reaction(
        &self,
        account_id: AccountId,
        target: ContentRef,
        symbol: &str,
        attitude: Attitude,
        now: i64,
    ) -> RepoResult<Reaction> {
        let fk = descriptor_for(target.kind).fk_column;
        let result = self.conn.execute(
            &format!(
                "INSERT INTO reactions (account_id, symbol, attitude, {fk}, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5);"
            ),
            params![account_id, symbol, attitude.as_str(), target.id, now],
        );
        match result {
            Ok(_) => Ok(Reaction {
                id: self.conn.last_insert_rowid(),
                account_id,
                symbol: symbol.to_string(),
                attitude,
                target,
                created_at: now,
            }),
            Err(err) if is_unique_violation(&err) => Err(RepoError::Conflict(format!(
                "reaction account={account_id} {fk}={} symbol={symbol}",
                target.id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    fn delete_reaction(&self, id: ReactionId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM reactions WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(format!("reactions#{id}")));
        }
        Ok(())
    }

    fn tally(
        &self,
        descriptor: &ContentTypeDescriptor,
        ids: &[ContentId],
    ) -> RepoResult<ReactionTally> {
        let mut tally = ReactionTally::new();
        if ids.is_empty() {
            return Ok(tally);
        }

        let fk = descriptor.fk_column;
        let sql = format!(
            "SELECT r.{fk} AS item_id, r.symbol AS symbol, COUNT(r.id) AS total
             FROM reactions r
             INNER JOIN {table} t ON t.id = r.{fk}
             WHERE r.{fk} IN ({})
             GROUP BY r.{fk}, r.symbol;",
            placeholders(ids.len()),
            table = descriptor.table
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(ids.iter()))?;
        while let Some(row) = rows.next()? {
            let item_id: ContentId = row.get("item_id")?;
            let symbol: String = row.get("symbol")?;
            let total: i64 = row.get("total")?;
            tally.entry(item_id).or_default().insert(symbol, total);
        }
        Ok(tally)
    }

    fn attitude_totals(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
    ) -> RepoResult<AttitudeTotals> {
        let fk = descriptor.fk_column;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT r.attitude AS attitude, COUNT(r.id) AS total
             FROM reactions r
             INNER JOIN {table} t ON t.id = r.{fk}
             WHERE r.{fk} = ?1
             GROUP BY r.attitude;",
            table = descriptor.table
        ))?;
        let mut rows = stmt.query([id])?;
        let mut totals = AttitudeTotals::default();
        while let Some(row) = rows.next()? {
            let attitude: String = row.get("attitude")?;
            let total: i64 = row.get("total")?;
            match Attitude::parse(&attitude) {
                Some(Attitude::Positive) => totals.positive = total,
                Some(Attitude::Negative) => totals.negative = total,
                None => {
                    return Err(RepoError::InvalidData(format!(
                        "invalid attitude `{attitude}` in reactions.attitude"
                    )));
                }
            }
        }
        Ok(totals)
    }

    fn count_dangling(&self, descriptor: &ContentTypeDescriptor) -> RepoResult<i64> {
        let count = self.conn.query_row(
            &format!(
                "SELECT COUNT(*)
                 FROM reactions r
                 WHERE r.{fk} IS NOT NULL
                   AND NOT EXISTS (SELECT 1 FROM {table} t WHERE t.id = r.{fk});",
                fk = descriptor.fk_column,
                table = descriptor.table
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_reaction_row(row: &Row<'_>) -> RepoResult<Reaction> {
    let id: ReactionId = row.get("id")?;
    let attitude_text: String = row.get("attitude")?;
    let attitude = Attitude::parse(&attitude_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid attitude `{attitude_text}` in reactions.id={id}"
        ))
    })?;

    let mut targets = Vec::new();
    for descriptor in descriptors() {
        if let Some(target_id) = row.get::<_, Option<i64>>(descriptor.fk_column)? {
            targets.push(ContentRef::new(descriptor.kind, target_id));
        }
    }
    let target = match targets.as_slice() {
        [target] => *target,
        _ => {
            return Err(RepoError::InvalidData(format!(
                "expected exactly one target in reactions.id={id}, found {}",
                targets.len()
            )));
        }
    };

    Ok(Reaction {
        id,
        account_id: row.get("account_id")?,
        symbol: row.get("symbol")?,
        attitude,
        target,
        created_at: row.get("created_at")?,
    })
}
