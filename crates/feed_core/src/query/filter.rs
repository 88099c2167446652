//! Immutable, chainable filter pipeline over one content table.
//!
//! # Responsibility
//! - Collect visibility/scope predicates without executing anything.
//! - Compile predicates into a parameterized WHERE fragment that the feed
//!   unifier can reuse inside every union branch.
//! - Execute `count`, `list` and `get_by_alias` for single-table queries.
//!
//! # Invariants
//! - Chaining methods take `&self` and return a new pipeline.
//! - Filter order does not change the result set.
//! - `list` never fails a page because of one malformed row.

use crate::model::content::{AccountId, ContentItem, ContentRef, RealmId};
use crate::query::page::{normalize_take, SortDirection};
use crate::registry::{descriptor_for, ContentTypeDescriptor};
use crate::repo::content_repo::{load_links, parse_content_row, select_sql};
use crate::repo::{RepoError, RepoResult};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// One predicate, compiled per descriptor at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    PublishedBefore(i64),
    /// `None` selects global (realm-less) items.
    Realm(Option<RealmId>),
    Author(AccountId),
    HasCategory(String),
    HasTag(String),
    ExcludeReplies,
    BelongsTo(ContentRef),
}

/// Query builder bound to a connection and one content descriptor.
#[derive(Debug, Clone)]
pub struct FilterPipeline<'conn> {
    conn: &'conn Connection,
    descriptor: &'static ContentTypeDescriptor,
    conditions: Vec<Condition>,
    sort: SortDirection,
}

impl<'conn> FilterPipeline<'conn> {
    pub fn new(conn: &'conn Connection, descriptor: &'static ContentTypeDescriptor) -> Self {
        Self {
            conn,
            descriptor,
            conditions: Vec::new(),
            sort: SortDirection::default(),
        }
    }

    pub fn descriptor(&self) -> &'static ContentTypeDescriptor {
        self.descriptor
    }

    /// Hides drafts and items scheduled after `t`.
    pub fn filter_published_before(&self, t: i64) -> Self {
        self.with(Condition::PublishedBefore(t))
    }

    /// `None` or `Some(0)` selects the global feed.
    pub fn filter_realm(&self, realm_id: Option<RealmId>) -> Self {
        let realm_id = realm_id.filter(|id| *id > 0);
        self.with(Condition::Realm(realm_id))
    }

    pub fn filter_author(&self, account_id: AccountId) -> Self {
        self.with(Condition::Author(account_id))
    }

    /// No-op when `alias` is absent or blank. Matches the stored alias exactly.
    pub fn filter_has_category(&self, alias: Option<&str>) -> Self {
        match trimmed(alias).map(str::to_string) {
            Some(alias) => self.with(Condition::HasCategory(alias)),
            None => self.clone(),
        }
    }

    /// No-op when `alias` is absent or blank. Tags are stored lowercased.
    pub fn filter_has_tag(&self, alias: Option<&str>) -> Self {
        match trimmed(alias).map(str::to_lowercase) {
            Some(alias) => self.with(Condition::HasTag(alias)),
            None => self.clone(),
        }
    }

    pub fn filter_exclude_replies(&self) -> Self {
        self.with(Condition::ExcludeReplies)
    }

    /// Comments attached to `parent`. Matches nothing on tables without
    /// parent columns.
    pub fn filter_belongs_to(&self, parent: ContentRef) -> Self {
        self.with(Condition::BelongsTo(parent))
    }

    pub fn sort_by_created_at(&self, direction: SortDirection) -> Self {
        let mut next = self.clone();
        next.sort = direction;
        next
    }

    /// Same conditions and ordering, applied to another table.
    pub fn rebind(&self, descriptor: &'static ContentTypeDescriptor) -> Self {
        let mut next = self.clone();
        next.descriptor = descriptor;
        next
    }

    pub(crate) fn direction(&self) -> SortDirection {
        self.sort
    }

    /// Compiles the WHERE body (without the keyword), appending binds.
    ///
    /// Returns `1 = 1` when no condition is set.
    pub(crate) fn where_sql(&self, binds: &mut Vec<Value>) -> String {
        if self.conditions.is_empty() {
            return "1 = 1".to_string();
        }
        self.conditions
            .iter()
            .map(|condition| compile_condition(self.descriptor, condition, binds))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn order_sql(&self) -> String {
        let direction = self.sort.as_sql();
        format!(
            "{table}.created_at {direction}, {table}.id {direction}",
            table = self.descriptor.table
        )
    }

    /// Counts matching rows.
    pub fn count(&self) -> RepoResult<i64> {
        let mut binds = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {};",
            self.descriptor.table,
            self.where_sql(&mut binds)
        );
        let count = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(count)
    }

    /// Lists one ordered page. `take` is normalized by `normalize_take`.
    pub fn list(&self, take: Option<u32>, offset: u32) -> RepoResult<Vec<ContentItem>> {
        let mut binds = Vec::new();
        let where_sql = self.where_sql(&mut binds);
        let sql = format!(
            "{} WHERE {where_sql} ORDER BY {} LIMIT ? OFFSET ?;",
            select_sql(self.descriptor),
            self.order_sql()
        );
        binds.push(Value::Integer(i64::from(normalize_take(take))));
        binds.push(Value::Integer(i64::from(offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            match parse_content_row(row, self.descriptor) {
                Ok(mut item) => {
                    load_links(self.conn, self.descriptor, &mut item)?;
                    items.push(item);
                }
                Err(err) => {
                    warn!(
                        "event=content_row_skipped module=query status=warn table={} error={}",
                        self.descriptor.table, err
                    );
                }
            }
        }
        Ok(items)
    }

    /// Returns the one matching item with `alias`.
    pub fn get_by_alias(&self, alias: &str) -> RepoResult<ContentItem> {
        let mut binds = Vec::new();
        let where_sql = self.where_sql(&mut binds);
        let sql = format!(
            "{} WHERE {where_sql} AND {}.alias = ? LIMIT 1;",
            select_sql(self.descriptor),
            self.descriptor.table
        );
        binds.push(Value::from(alias.to_string()));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        match rows.next()? {
            Some(row) => {
                let mut item = parse_content_row(row, self.descriptor).map_err(|err| match err {
                    RepoError::Db(err) => RepoError::InvalidData(err.to_string()),
                    other => other,
                })?;
                load_links(self.conn, self.descriptor, &mut item)?;
                Ok(item)
            }
            None => Err(RepoError::NotFound(format!(
                "{}.alias={alias}",
                self.descriptor.table
            ))),
        }
    }

    fn with(&self, condition: Condition) -> Self {
        let mut next = self.clone();
        next.conditions.push(condition);
        next
    }
}

fn trimmed(alias: Option<&str>) -> Option<&str> {
    alias.map(str::trim).filter(|value| !value.is_empty())
}

fn compile_condition(
    descriptor: &ContentTypeDescriptor,
    condition: &Condition,
    binds: &mut Vec<Value>,
) -> String {
    let table = descriptor.table;
    let fk = descriptor.fk_column;
    match condition {
        Condition::PublishedBefore(t) => {
            binds.push(Value::Integer(*t));
            format!("({table}.published_at IS NOT NULL AND {table}.published_at <= ?)")
        }
        Condition::Realm(None) => format!("{table}.realm_id IS NULL"),
        Condition::Realm(Some(realm_id)) => {
            binds.push(Value::Integer(*realm_id));
            format!("{table}.realm_id = ?")
        }
        Condition::Author(account_id) => {
            binds.push(Value::Integer(*account_id));
            format!("{table}.author_id = ?")
        }
        Condition::HasCategory(alias) => {
            binds.push(Value::from(alias.clone()));
            format!(
                "EXISTS (SELECT 1 FROM {link} l
                         INNER JOIN categories c ON c.id = l.category_id
                         WHERE l.{fk} = {table}.id AND c.alias = ?)",
                link = descriptor.category_link_table
            )
        }
        Condition::HasTag(alias) => {
            binds.push(Value::from(alias.clone()));
            format!(
                "EXISTS (SELECT 1 FROM {link} l
                         INNER JOIN tags t ON t.id = l.tag_id
                         WHERE l.{fk} = {table}.id AND t.alias = ?)",
                link = descriptor.tag_link_table
            )
        }
        Condition::ExcludeReplies => format!("{table}.reply_id IS NULL"),
        Condition::BelongsTo(parent) => {
            if !descriptor.has_parent {
                return "0 = 1".to_string();
            }
            binds.push(Value::Integer(parent.id));
            format!(
                "{table}.{column} = ?",
                column = descriptor_for(parent.kind).fk_column
            )
        }
    }
}
