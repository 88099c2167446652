//! Unified feed and read-side content APIs.
//!
//! # Responsibility
//! - Merge every feed-enabled content table into one time-ordered page.
//! - Hydrate pages with author snapshots, reaction tallies and comment counts.
//! - Serve single-item reads, comment listings and per-item metrics.
//!
//! # Invariants
//! - Scope predicates are built once and compiled inside every union branch.
//! - Branches share column order and labels; the model type is a bound value.
//! - Hydration queries cover exactly the ids on the returned page.
//! - Only published items (`published_at <= now`) are visible.
//! - Rows whose author no longer exists are skipped and logged.

use crate::db::now_epoch_ms;
use crate::model::content::{AccountId, ContentId, ContentItem, ContentKind, ContentRef, RealmId};
use crate::model::feed::{AuthorSnapshot, ContentMetrics, FeedItem, FeedPage};
use crate::query::{FilterPipeline, PageRequest, SortDirection};
use crate::registry::{descriptor_for, descriptors, feed_descriptors, resolve, ContentTypeDescriptor};
use crate::repo::content_repo::{ContentRepository, SqliteContentRepository};
use crate::repo::directory_repo::AccountStore;
use crate::repo::reaction_repo::ReactionTally;
use crate::repo::RepoError;
use crate::service::aggregator::ReactionAggregator;
use crate::service::error::{ServiceError, ServiceResult};
use log::{info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Caller scope for `list_feed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedScope {
    /// `None` or `Some(0)` selects the global feed.
    pub realm_id: Option<RealmId>,
    /// Author account handle.
    pub author: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub exclude_replies: bool,
    pub direction: SortDirection,
    /// When false, reaction counts are reported as zero without querying.
    pub include_reactions: bool,
}

impl Default for FeedScope {
    fn default() -> Self {
        Self {
            realm_id: None,
            author: None,
            category: None,
            tag: None,
            exclude_replies: false,
            direction: SortDirection::Desc,
            include_reactions: true,
        }
    }
}

/// One unified row before hydration.
struct FeedRow {
    id: ContentId,
    kind: ContentKind,
    alias: String,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    author_id: AccountId,
    realm_id: Option<RealmId>,
    published_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl FeedRow {
    fn from_item(item: ContentItem) -> Self {
        let include_body = descriptor_for(item.kind).feed_includes_body;
        Self {
            id: item.id,
            kind: item.kind,
            alias: item.alias,
            title: item.title,
            description: item.description,
            content: include_body.then_some(item.content),
            author_id: item.author_id,
            realm_id: item.realm_id,
            published_at: item.published_at,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Read-side facade over the feed unifier and aggregator.
pub struct FeedService<'conn, A: AccountStore> {
    conn: &'conn Connection,
    accounts: A,
    aggregator: ReactionAggregator<'conn>,
}

impl<'conn, A: AccountStore> FeedService<'conn, A> {
    pub fn new(conn: &'conn Connection, accounts: A) -> Self {
        Self {
            conn,
            accounts,
            aggregator: ReactionAggregator::new(conn),
        }
    }

    /// Lists one page of the unified article/moment feed.
    pub fn list_feed(&self, scope: &FeedScope, page: PageRequest) -> ServiceResult<FeedPage> {
        let applied_limit = page.applied_limit();
        let branches: Vec<&'static ContentTypeDescriptor> = feed_descriptors().collect();
        let Some(first) = branches.first().copied() else {
            return Ok(FeedPage::empty(applied_limit));
        };

        let mut pipeline = FilterPipeline::new(self.conn, first)
            .filter_published_before(now_epoch_ms())
            .filter_realm(scope.realm_id)
            .filter_has_category(scope.category.as_deref())
            .filter_has_tag(scope.tag.as_deref())
            .sort_by_created_at(scope.direction);
        if scope.exclude_replies {
            pipeline = pipeline.filter_exclude_replies();
        }
        if let Some(handle) = scope
            .author
            .as_deref()
            .map(str::trim)
            .filter(|handle| !handle.is_empty())
        {
            match self.accounts.get_account_by_handle(handle)? {
                Some(account) => pipeline = pipeline.filter_author(account.id),
                None => {
                    info!("event=feed_list module=service status=ok reason=unknown_author total=0");
                    return Ok(FeedPage::empty(applied_limit));
                }
            }
        }

        let mut count_binds = Vec::new();
        let count_sql = format!(
            "SELECT COUNT(*) FROM ({}) AS feed;",
            union_sql(&pipeline, &branches, &mut count_binds)
        );
        let total: i64 = self
            .conn
            .query_row(&count_sql, params_from_iter(count_binds), |row| row.get(0))?;

        let mut binds = Vec::new();
        let direction = pipeline.direction().as_sql();
        let page_sql = format!(
            "SELECT * FROM ({}) AS feed
             ORDER BY created_at {direction}, id {direction}, model_type {direction}
             LIMIT ? OFFSET ?;",
            union_sql(&pipeline, &branches, &mut binds)
        );
        binds.push(Value::Integer(i64::from(applied_limit)));
        binds.push(Value::Integer(i64::from(page.offset)));

        let mut rows = Vec::new();
        {
            let mut stmt = self.conn.prepare(&page_sql)?;
            let mut cursor = stmt.query(params_from_iter(binds))?;
            while let Some(row) = cursor.next()? {
                match parse_feed_row(row) {
                    Ok(parsed) => rows.push(parsed),
                    Err(err) => warn!(
                        "event=feed_row_skipped module=service status=warn error={}",
                        err
                    ),
                }
            }
        }

        let items = self.hydrate(rows, scope.include_reactions)?;
        info!(
            "event=feed_list module=service status=ok total={} returned={} limit={} offset={}",
            total,
            items.len(),
            applied_limit,
            page.offset
        );
        Ok(FeedPage {
            total,
            applied_limit,
            items,
        })
    }

    /// Lists published comments attached to one item, newest first.
    pub fn list_comments(
        &self,
        type_name: &str,
        id: ContentId,
        page: PageRequest,
    ) -> ServiceResult<FeedPage> {
        let descriptor = resolve(type_name)?;
        self.ensure_exists(descriptor, id)?;

        let pipeline = FilterPipeline::new(self.conn, descriptor_for(ContentKind::Comment))
            .filter_belongs_to(ContentRef::new(descriptor.kind, id))
            .filter_published_before(now_epoch_ms());
        let total = pipeline.count()?;
        let rows = pipeline
            .list(page.take, page.offset)?
            .into_iter()
            .map(FeedRow::from_item)
            .collect();

        Ok(FeedPage {
            total,
            applied_limit: page.applied_limit(),
            items: self.hydrate(rows, true)?,
        })
    }

    /// Returns one published item by alias.
    pub fn get_content_item(&self, type_name: &str, alias: &str) -> ServiceResult<ContentItem> {
        let descriptor = resolve(type_name)?;
        FilterPipeline::new(self.conn, descriptor)
            .filter_published_before(now_epoch_ms())
            .get_by_alias(alias)
            .map_err(|err| match err {
                RepoError::NotFound(_) => ServiceError::not_found(descriptor.model_type, alias),
                other => other.into(),
            })
    }

    /// Published comments attached to one item.
    pub fn count_comments(&self, type_name: &str, id: ContentId) -> ServiceResult<i64> {
        let descriptor = resolve(type_name)?;
        self.aggregator.count_comments(descriptor, id)
    }

    /// All derived counters for one existing item.
    pub fn content_metrics(&self, type_name: &str, id: ContentId) -> ServiceResult<ContentMetrics> {
        let descriptor = resolve(type_name)?;
        self.ensure_exists(descriptor, id)?;

        let reaction_list = self
            .aggregator
            .tally(descriptor, &[id])?
            .remove(&id)
            .unwrap_or_default();
        let attitudes = self.aggregator.attitude_totals(descriptor, id)?;
        Ok(ContentMetrics {
            reaction_count: reaction_list.values().sum(),
            positive_count: attitudes.positive,
            negative_count: attitudes.negative,
            comment_count: self.aggregator.count_comments(descriptor, id)?,
            reply_count: self.aggregator.count_replies(descriptor, id)?,
            repost_count: self.aggregator.count_reposts(descriptor, id)?,
            reaction_list,
        })
    }

    fn ensure_exists(&self, descriptor: &ContentTypeDescriptor, id: ContentId) -> ServiceResult<()> {
        if SqliteContentRepository::new(self.conn).content_exists(descriptor, id)? {
            Ok(())
        } else {
            Err(ServiceError::not_found(descriptor.model_type, id))
        }
    }

    fn hydrate(&self, rows: Vec<FeedRow>, include_reactions: bool) -> ServiceResult<Vec<FeedItem>> {
        let mut authors: HashMap<AccountId, Option<AuthorSnapshot>> = HashMap::new();
        let mut ids_by_kind: BTreeMap<ContentKind, Vec<ContentId>> = BTreeMap::new();
        for row in &rows {
            if !authors.contains_key(&row.author_id) {
                let author = self.accounts.get_account_by_id(row.author_id)?;
                authors.insert(row.author_id, author.as_ref().map(AuthorSnapshot::from));
            }
            ids_by_kind.entry(row.kind).or_default().push(row.id);
        }

        let mut tallies: HashMap<ContentKind, ReactionTally> = HashMap::new();
        let mut comment_counts: HashMap<ContentKind, HashMap<ContentId, i64>> = HashMap::new();
        for (kind, ids) in &ids_by_kind {
            let descriptor = descriptor_for(*kind);
            if include_reactions {
                tallies.insert(*kind, self.aggregator.tally(descriptor, ids)?);
            }
            comment_counts.insert(*kind, self.aggregator.count_comments_batch(descriptor, ids)?);
        }

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(author) = authors.get(&row.author_id).cloned().flatten() else {
                warn!(
                    "event=dangling_reference module=service status=warn model_type={} id={} author_id={}",
                    descriptor_for(row.kind).model_type,
                    row.id,
                    row.author_id
                );
                continue;
            };
            let reaction_list = tallies
                .get(&row.kind)
                .and_then(|tally| tally.get(&row.id))
                .cloned()
                .unwrap_or_default();
            let comment_count = comment_counts
                .get(&row.kind)
                .and_then(|counts| counts.get(&row.id))
                .copied()
                .unwrap_or(0);

            items.push(FeedItem {
                id: row.id,
                alias: row.alias,
                title: row.title,
                description: row.description,
                content: row.content,
                model_type: row.kind,
                author,
                realm_id: row.realm_id,
                published_at: row.published_at,
                created_at: row.created_at,
                updated_at: row.updated_at,
                comment_count,
                reaction_count: reaction_list.values().sum(),
                reaction_list,
            });
        }
        Ok(items)
    }
}

fn union_sql(
    scope: &FilterPipeline<'_>,
    branches: &[&'static ContentTypeDescriptor],
    binds: &mut Vec<Value>,
) -> String {
    branches
        .iter()
        .copied()
        .map(|descriptor| branch_sql(&scope.rebind(descriptor), binds))
        .collect::<Vec<_>>()
        .join(" UNION ALL ")
}

fn branch_sql(pipeline: &FilterPipeline<'_>, binds: &mut Vec<Value>) -> String {
    let descriptor = pipeline.descriptor();
    let table = descriptor.table;
    let (title, description) = if descriptor.has_title {
        (format!("{table}.title"), format!("{table}.description"))
    } else {
        ("NULL".to_string(), "NULL".to_string())
    };
    let content = if descriptor.feed_includes_body {
        format!("{table}.content")
    } else {
        "NULL".to_string()
    };

    binds.push(Value::from(descriptor.model_type.to_string()));
    let where_sql = pipeline.where_sql(binds);
    format!(
        "SELECT
            {table}.id AS id,
            {table}.alias AS alias,
            {title} AS title,
            {description} AS description,
            {content} AS content,
            {table}.author_id AS author_id,
            {table}.realm_id AS realm_id,
            {table}.published_at AS published_at,
            {table}.created_at AS created_at,
            {table}.updated_at AS updated_at,
            ? AS model_type
        FROM {table}
        WHERE {where_sql}"
    )
}

fn parse_feed_row(row: &Row<'_>) -> Result<FeedRow, RepoError> {
    let model_type: String = row.get("model_type")?;
    let descriptor = descriptors()
        .find(|descriptor| descriptor.model_type == model_type)
        .ok_or_else(|| RepoError::InvalidData(format!("unknown model_type `{model_type}`")))?;

    Ok(FeedRow {
        id: row.get("id")?,
        kind: descriptor.kind,
        alias: row.get("alias")?,
        title: row.get("title")?,
        description: row.get("description")?,
        content: row.get("content")?,
        author_id: row.get("author_id")?,
        realm_id: row.get("realm_id")?,
        published_at: row.get("published_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
