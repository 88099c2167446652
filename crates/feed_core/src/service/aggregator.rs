//! Reaction and comment aggregation.
//!
//! # Responsibility
//! - Per-symbol reaction tallies for an arbitrary id set of one content type.
//! - Comment, reply and repost counters.
//!
//! # Invariants
//! - One grouped query per descriptor; never scans ids outside the input set.
//! - Comments, replies and reposts count only when `published_at <= now`.
//! - Replies and reposts are counted within the same content table.
//! - Rows pointing at deleted items are excluded, never counted.

use crate::db::now_epoch_ms;
use crate::model::content::{ContentId, ContentKind, ContentRef};
use crate::model::reaction::AttitudeTotals;
use crate::query::FilterPipeline;
use crate::registry::{descriptor_for, ContentTypeDescriptor};
use crate::repo::content_repo::{ContentRepository, SqliteContentRepository};
use crate::repo::placeholders;
use crate::repo::reaction_repo::{ReactionRepository, ReactionTally, SqliteReactionRepository};
use crate::service::error::ServiceResult;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::HashMap;

/// Read-side counters over reactions and comments.
pub struct ReactionAggregator<'conn> {
    conn: &'conn Connection,
    reactions: SqliteReactionRepository<'conn>,
}

impl<'conn> ReactionAggregator<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            reactions: SqliteReactionRepository::new(conn),
        }
    }

    /// Symbol counts per id. Ids without reactions are absent from the map.
    pub fn tally(
        &self,
        descriptor: &ContentTypeDescriptor,
        ids: &[ContentId],
    ) -> ServiceResult<ReactionTally> {
        Ok(self.reactions.tally(descriptor, ids)?)
    }

    pub fn attitude_totals(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
    ) -> ServiceResult<AttitudeTotals> {
        Ok(self.reactions.attitude_totals(descriptor, id)?)
    }

    /// Published comments attached to one item. Zero once the item is gone.
    pub fn count_comments(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
    ) -> ServiceResult<i64> {
        if !SqliteContentRepository::new(self.conn).content_exists(descriptor, id)? {
            return Ok(0);
        }
        let count = FilterPipeline::new(self.conn, descriptor_for(ContentKind::Comment))
            .filter_belongs_to(ContentRef::new(descriptor.kind, id))
            .filter_published_before(now_epoch_ms())
            .count()?;
        Ok(count)
    }

    /// Published comment counts for a page of items, in one grouped query.
    pub fn count_comments_batch(
        &self,
        descriptor: &ContentTypeDescriptor,
        ids: &[ContentId],
    ) -> ServiceResult<HashMap<ContentId, i64>> {
        let mut counts = HashMap::new();
        if ids.is_empty() {
            return Ok(counts);
        }

        let fk = descriptor.fk_column;
        let sql = format!(
            "SELECT c.{fk} AS item_id, COUNT(c.id) AS total
             FROM {comments} c
             INNER JOIN {table} t ON t.id = c.{fk}
             WHERE c.{fk} IN ({})
               AND c.published_at IS NOT NULL
               AND c.published_at <= ?
             GROUP BY c.{fk};",
            placeholders(ids.len()),
            comments = descriptor_for(ContentKind::Comment).table,
            table = descriptor.table
        );
        let mut binds: Vec<Value> = ids.iter().map(|id| Value::Integer(*id)).collect();
        binds.push(Value::Integer(now_epoch_ms()));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        while let Some(row) = rows.next()? {
            counts.insert(row.get("item_id")?, row.get("total")?);
        }
        Ok(counts)
    }

    /// Published replies to one item; zero when the type cannot be replied to.
    pub fn count_replies(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
    ) -> ServiceResult<i64> {
        if !descriptor.can_reply {
            return Ok(0);
        }
        self.count_referencing(descriptor, "reply_id", id)
    }

    /// Published reposts of one item; zero when the type cannot be reposted.
    pub fn count_reposts(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
    ) -> ServiceResult<i64> {
        if !descriptor.can_repost {
            return Ok(0);
        }
        self.count_referencing(descriptor, "repost_id", id)
    }

    fn count_referencing(
        &self,
        descriptor: &ContentTypeDescriptor,
        column: &'static str,
        id: ContentId,
    ) -> ServiceResult<i64> {
        let sql = format!(
            "SELECT COUNT(*)
             FROM {table}
             WHERE {column} = ?1
               AND published_at IS NOT NULL
               AND published_at <= ?2;",
            table = descriptor.table
        );
        let count = self.conn.query_row(
            &sql,
            [Value::Integer(id), Value::Integer(now_epoch_ms())],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
