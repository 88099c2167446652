//! Content repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide row-level CRUD over the three content tables through one
//!   descriptor-driven API.
//! - Own join-table maintenance (categories, tags, attachments).
//!
//! # Invariants
//! - SQL identifiers are taken from `ContentTypeDescriptor` only.
//! - Read paths reject structurally invalid rows with `InvalidData`.
//! - Deleting an item removes its join rows, never reactions or comments.

use crate::model::content::{AccountId, ContentId, ContentItem, ContentRef, RealmId};
use crate::registry::{descriptor_for, descriptors, parent_columns, ContentTypeDescriptor};
use crate::repo::{is_unique_violation, placeholders, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

/// Column values written on create/edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRow {
    pub alias: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: String,
    pub author_id: AccountId,
    pub realm_id: Option<RealmId>,
    pub published_at: Option<i64>,
    pub reply_id: Option<ContentId>,
    pub repost_id: Option<ContentId>,
    pub parent: Option<ContentRef>,
}

/// Resolved join-table rows for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentLinks {
    pub category_ids: Vec<i64>,
    pub tag_ids: Vec<i64>,
    pub attachments: Vec<String>,
}

/// Repository interface for polymorphic content rows.
pub trait ContentRepository {
    fn insert_content(
        &self,
        descriptor: &ContentTypeDescriptor,
        row: &ContentRow,
        now: i64,
    ) -> RepoResult<ContentId>;
    /// Rewrites mutable columns; realm, author and references are kept.
    fn update_content(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
        row: &ContentRow,
        now: i64,
    ) -> RepoResult<()>;
    fn replace_links(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
        links: &ContentLinks,
    ) -> RepoResult<()>;
    fn delete_content(&self, descriptor: &ContentTypeDescriptor, id: ContentId) -> RepoResult<()>;
    fn get_content(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
    ) -> RepoResult<Option<ContentItem>>;
    /// Exact `id + author_id` lookup used for ownership checks.
    fn get_owned_content(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
        author_id: AccountId,
    ) -> RepoResult<Option<ContentItem>>;
    fn content_exists(&self, descriptor: &ContentTypeDescriptor, id: ContentId)
        -> RepoResult<bool>;
}

/// SQLite-backed content repository.
pub struct SqliteContentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_one(
        &self,
        descriptor: &ContentTypeDescriptor,
        where_sql: &str,
        binds: Vec<Value>,
    ) -> RepoResult<Option<ContentItem>> {
        let sql = format!("{} WHERE {where_sql};", select_sql(descriptor));
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        if let Some(row) = rows.next()? {
            let mut item = parse_content_row(row, descriptor)?;
            load_links(self.conn, descriptor, &mut item)?;
            return Ok(Some(item));
        }
        Ok(None)
    }
}

impl ContentRepository for SqliteContentRepository<'_> {
    fn insert_content(
        &self,
        descriptor: &ContentTypeDescriptor,
        row: &ContentRow,
        now: i64,
    ) -> RepoResult<ContentId> {
        let mut columns: Vec<&str> = vec![
            "alias",
            "content",
            "author_id",
            "realm_id",
            "published_at",
            "reply_id",
            "repost_id",
            "created_at",
            "updated_at",
        ];
        let mut values: Vec<Value> = vec![
            Value::from(row.alias.clone()),
            Value::from(row.content.clone()),
            Value::from(row.author_id),
            Value::from(row.realm_id),
            Value::from(row.published_at),
            Value::from(row.reply_id),
            Value::from(row.repost_id),
            Value::from(now),
            Value::from(now),
        ];

        if descriptor.has_title {
            let title = row.title.clone().ok_or_else(|| {
                RepoError::InvalidData(format!("{} rows require a title", descriptor.table))
            })?;
            columns.push("title");
            values.push(Value::from(title));
            columns.push("description");
            values.push(Value::from(row.description.clone()));
        }

        if descriptor.has_parent {
            let parent = row.parent.ok_or_else(|| {
                RepoError::InvalidData(format!("{} rows require a parent", descriptor.table))
            })?;
            columns.push(descriptor_for(parent.kind).fk_column);
            values.push(Value::from(parent.id));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            descriptor.table,
            columns.join(", "),
            placeholders(columns.len())
        );
        self.conn
            .execute(&sql, params_from_iter(values))
            .map_err(|err| alias_conflict(err, descriptor, &row.alias))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_content(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
        row: &ContentRow,
        now: i64,
    ) -> RepoResult<()> {
        let mut assignments = vec!["alias = ?", "content = ?", "published_at = ?", "updated_at = ?"];
        let mut values: Vec<Value> = vec![
            Value::from(row.alias.clone()),
            Value::from(row.content.clone()),
            Value::from(row.published_at),
            Value::from(now),
        ];
        if descriptor.has_title {
            assignments.push("title = ?");
            values.push(Value::from(row.title.clone().unwrap_or_default()));
            assignments.push("description = ?");
            values.push(Value::from(row.description.clone()));
        }
        values.push(Value::from(id));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?;",
            descriptor.table,
            assignments.join(", ")
        );
        let changed = self
            .conn
            .execute(&sql, params_from_iter(values))
            .map_err(|err| alias_conflict(err, descriptor, &row.alias))?;
        if changed == 0 {
            return Err(RepoError::NotFound(format!("{}#{id}", descriptor.table)));
        }
        Ok(())
    }

    fn replace_links(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
        links: &ContentLinks,
    ) -> RepoResult<()> {
        delete_links(self.conn, descriptor, id)?;

        let fk = descriptor.fk_column;
        for category_id in &links.category_ids {
            self.conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO {} ({fk}, category_id) VALUES (?1, ?2);",
                    descriptor.category_link_table
                ),
                params![id, category_id],
            )?;
        }
        for tag_id in &links.tag_ids {
            self.conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO {} ({fk}, tag_id) VALUES (?1, ?2);",
                    descriptor.tag_link_table
                ),
                params![id, tag_id],
            )?;
        }
        for (position, attachment_id) in links.attachments.iter().enumerate() {
            self.conn.execute(
                &format!(
                    "INSERT INTO {} ({fk}, position, attachment_id) VALUES (?1, ?2, ?3);",
                    descriptor.attachment_table
                ),
                params![id, position as i64, attachment_id],
            )?;
        }
        Ok(())
    }

    fn delete_content(&self, descriptor: &ContentTypeDescriptor, id: ContentId) -> RepoResult<()> {
        delete_links(self.conn, descriptor, id)?;
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", descriptor.table),
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(format!("{}#{id}", descriptor.table)));
        }
        Ok(())
    }

    fn get_content(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
    ) -> RepoResult<Option<ContentItem>> {
        self.query_one(
            descriptor,
            &format!("{}.id = ?", descriptor.table),
            vec![Value::from(id)],
        )
    }

    fn get_owned_content(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
        author_id: AccountId,
    ) -> RepoResult<Option<ContentItem>> {
        self.query_one(
            descriptor,
            &format!(
                "{table}.id = ? AND {table}.author_id = ?",
                table = descriptor.table
            ),
            vec![Value::from(id), Value::from(author_id)],
        )
    }

    fn content_exists(
        &self,
        descriptor: &ContentTypeDescriptor,
        id: ContentId,
    ) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
                descriptor.table
            ),
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

/// Uniform projection of one content table; absent columns are NULL.
pub(crate) fn select_sql(descriptor: &ContentTypeDescriptor) -> String {
    let table = descriptor.table;
    let (title, description) = if descriptor.has_title {
        (format!("{table}.title"), format!("{table}.description"))
    } else {
        ("NULL".to_string(), "NULL".to_string())
    };
    let parents = parent_columns().map(|column| {
        if descriptor.has_parent {
            format!("{table}.{column} AS {column}")
        } else {
            format!("NULL AS {column}")
        }
    });

    format!(
        "SELECT
            {table}.id AS id,
            {table}.alias AS alias,
            {title} AS title,
            {description} AS description,
            {table}.content AS content,
            {table}.author_id AS author_id,
            {table}.realm_id AS realm_id,
            {table}.published_at AS published_at,
            {table}.reply_id AS reply_id,
            {table}.repost_id AS repost_id,
            {},
            {table}.created_at AS created_at,
            {table}.updated_at AS updated_at
        FROM {table}",
        parents.join(", ")
    )
}

/// Parses one row produced by `select_sql`. Join-table sets are left empty.
pub(crate) fn parse_content_row(
    row: &Row<'_>,
    descriptor: &ContentTypeDescriptor,
) -> RepoResult<ContentItem> {
    let id: ContentId = row.get("id")?;
    let title: Option<String> = row.get("title")?;
    if descriptor.has_title && title.is_none() {
        return Err(RepoError::InvalidData(format!(
            "missing title in {}.id={id}",
            descriptor.table
        )));
    }

    let parent = if descriptor.has_parent {
        let mut present = Vec::new();
        for parent_descriptor in descriptors() {
            if let Some(parent_id) = row.get::<_, Option<i64>>(parent_descriptor.fk_column)? {
                present.push(ContentRef::new(parent_descriptor.kind, parent_id));
            }
        }
        if present.len() != 1 {
            return Err(RepoError::InvalidData(format!(
                "expected exactly one parent in {}.id={id}, found {}",
                descriptor.table,
                present.len()
            )));
        }
        present.pop()
    } else {
        None
    };

    Ok(ContentItem {
        id,
        kind: descriptor.kind,
        alias: row.get("alias")?,
        title,
        description: row.get("description")?,
        content: row.get("content")?,
        author_id: row.get("author_id")?,
        realm_id: row.get("realm_id")?,
        published_at: row.get("published_at")?,
        reply_id: row.get("reply_id")?,
        repost_id: row.get("repost_id")?,
        parent,
        attachments: Vec::new(),
        categories: Vec::new(),
        tags: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Loads category/tag aliases and attachment ids into `item`.
pub(crate) fn load_links(
    conn: &Connection,
    descriptor: &ContentTypeDescriptor,
    item: &mut ContentItem,
) -> RepoResult<()> {
    let fk = descriptor.fk_column;
    item.categories = query_strings(
        conn,
        &format!(
            "SELECT c.alias
             FROM {} l
             INNER JOIN categories c ON c.id = l.category_id
             WHERE l.{fk} = ?1
             ORDER BY c.alias ASC;",
            descriptor.category_link_table
        ),
        item.id,
    )?;
    item.tags = query_strings(
        conn,
        &format!(
            "SELECT t.alias
             FROM {} l
             INNER JOIN tags t ON t.id = l.tag_id
             WHERE l.{fk} = ?1
             ORDER BY t.alias ASC;",
            descriptor.tag_link_table
        ),
        item.id,
    )?;
    item.attachments = query_strings(
        conn,
        &format!(
            "SELECT attachment_id FROM {} WHERE {fk} = ?1 ORDER BY position ASC;",
            descriptor.attachment_table
        ),
        item.id,
    )?;
    Ok(())
}

fn query_strings(conn: &Connection, sql: &str, id: ContentId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([id])?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        values.push(row.get(0)?);
    }
    Ok(values)
}

fn delete_links(
    conn: &Connection,
    descriptor: &ContentTypeDescriptor,
    id: ContentId,
) -> RepoResult<()> {
    for table in [
        descriptor.category_link_table,
        descriptor.tag_link_table,
        descriptor.attachment_table,
    ] {
        conn.execute(
            &format!("DELETE FROM {table} WHERE {} = ?1;", descriptor.fk_column),
            [id],
        )?;
    }
    Ok(())
}

fn alias_conflict(err: rusqlite::Error, descriptor: &ContentTypeDescriptor, alias: &str) -> RepoError {
    if is_unique_violation(&err) {
        RepoError::Conflict(format!("{}.alias={alias}", descriptor.table))
    } else {
        err.into()
    }
}
