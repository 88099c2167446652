//! Content mutation use-cases.
//!
//! # Responsibility
//! - Validate and persist create/edit/delete requests for every content type.
//! - Resolve categories (must exist) and tags (get-or-create).
//! - Enforce realm posting permission.
//! - Submit reply/follower notifications after a successful create.
//!
//! # Invariants
//! - Each mutation runs in one transaction; any failure persists nothing.
//! - Edit and delete use an exact `id + author_id` lookup; a miss is `NotFound`.
//! - Edit keeps realm, author and references unchanged.
//! - Notification problems are logged and never returned to the caller.

use crate::db::now_epoch_ms;
use crate::model::content::{AccountId, ContentChanges, ContentDraft, ContentId, ContentItem, ContentRef, RealmId};
use crate::model::directory::Account;
use crate::notify::{Notification, NotificationFanout, NotificationLink};
use crate::registry::{descriptor_for, resolve, ContentTypeDescriptor};
use crate::repo::content_repo::{ContentLinks, ContentRepository, ContentRow, SqliteContentRepository};
use crate::repo::directory_repo::Directory;
use crate::repo::taxonomy_repo::{
    normalize_aliases, trim_category_aliases, SqliteTaxonomyRepository, TaxonomyRepository,
};
use crate::service::error::{ServiceError, ServiceResult};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use uuid::Uuid;

static CONTENT_ALIAS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,127}$").expect("valid content alias regex")
});

const MAX_TITLE_CHARS: usize = 1024;
const RELATED_LINK_LABEL: &str = "Related post";

/// Create/edit/delete facade over content storage.
pub struct ContentService<'conn, D: Directory> {
    conn: &'conn Connection,
    directory: D,
    fanout: &'conn NotificationFanout,
    public_base_url: Option<&'conn str>,
}

impl<'conn, D: Directory> ContentService<'conn, D> {
    pub fn new(
        conn: &'conn Connection,
        directory: D,
        fanout: &'conn NotificationFanout,
        public_base_url: Option<&'conn str>,
    ) -> Self {
        Self {
            conn,
            directory,
            fanout,
            public_base_url,
        }
    }

    /// Creates one content item and submits notifications on success.
    pub fn create(
        &self,
        author_id: AccountId,
        type_name: &str,
        draft: ContentDraft,
    ) -> ServiceResult<ContentItem> {
        let descriptor = resolve(type_name)?;
        let author = self
            .directory
            .get_account_by_id(author_id)?
            .ok_or_else(|| ServiceError::not_found("account", author_id))?;

        require_non_blank(&draft.content, "content")?;
        let (title, description) =
            validate_heading(descriptor, draft.title.as_deref(), draft.description.as_deref())?;
        let alias = match draft.alias.as_deref() {
            Some(alias) => validate_alias(alias)?,
            None => Uuid::new_v4().simple().to_string(),
        };

        let realm_id = draft.realm_id.filter(|id| *id > 0);
        if let Some(realm_id) = realm_id {
            self.check_realm_access(realm_id, author_id)?;
        }

        let now = now_epoch_ms();
        let published_at = if draft.draft {
            None
        } else {
            Some(draft.published_at.unwrap_or(now))
        };

        let tx = self.conn.unchecked_transaction()?;
        let repo = SqliteContentRepository::new(&tx);
        validate_references(&repo, descriptor, &draft)?;
        let links = resolve_links(&tx, &draft.categories, &draft.tags, &draft.attachments)?;

        let row = ContentRow {
            alias,
            title,
            description,
            content: draft.content,
            author_id,
            realm_id,
            published_at,
            reply_id: draft.reply_to,
            repost_id: draft.repost_to,
            parent: draft.parent,
        };
        let id = repo.insert_content(descriptor, &row, now)?;
        repo.replace_links(descriptor, id, &links)?;
        let item = repo
            .get_content(descriptor, id)?
            .ok_or_else(|| ServiceError::not_found(descriptor.model_type, id))?;
        tx.commit()?;

        info!(
            "event=content_create module=service status=ok model_type={} id={} author_id={} draft={}",
            descriptor.model_type,
            item.id,
            author_id,
            item.is_draft()
        );

        if item.is_published_at(now) {
            self.notify_created(&author, descriptor, &item);
        }
        Ok(item)
    }

    /// Edits one item owned by `author_id`.
    pub fn edit(
        &self,
        author_id: AccountId,
        type_name: &str,
        id: ContentId,
        changes: ContentChanges,
    ) -> ServiceResult<ContentItem> {
        let descriptor = resolve(type_name)?;
        require_non_blank(&changes.content, "content")?;
        let (title, description) = validate_heading(
            descriptor,
            changes.title.as_deref(),
            changes.description.as_deref(),
        )?;

        let now = now_epoch_ms();
        let tx = self.conn.unchecked_transaction()?;
        let repo = SqliteContentRepository::new(&tx);
        let existing = repo
            .get_owned_content(descriptor, id, author_id)?
            .ok_or_else(|| ServiceError::not_found(descriptor.model_type, id))?;

        let alias = match changes.alias.as_deref() {
            Some(alias) => validate_alias(alias)?,
            None => existing.alias.clone(),
        };
        let published_at = if changes.draft {
            None
        } else {
            Some(changes.published_at.unwrap_or(now))
        };
        let links = resolve_links(&tx, &changes.categories, &changes.tags, &changes.attachments)?;

        let row = ContentRow {
            alias,
            title,
            description,
            content: changes.content,
            author_id: existing.author_id,
            realm_id: existing.realm_id,
            published_at,
            reply_id: existing.reply_id,
            repost_id: existing.repost_id,
            parent: existing.parent,
        };
        repo.update_content(descriptor, id, &row, now)?;
        repo.replace_links(descriptor, id, &links)?;
        let item = repo
            .get_content(descriptor, id)?
            .ok_or_else(|| ServiceError::not_found(descriptor.model_type, id))?;
        tx.commit()?;

        info!(
            "event=content_edit module=service status=ok model_type={} id={} author_id={}",
            descriptor.model_type, id, author_id
        );
        Ok(item)
    }

    /// Hard-deletes one item owned by `author_id` with its join rows.
    ///
    /// Reactions and comments pointing at the item are left in place.
    pub fn delete(&self, author_id: AccountId, type_name: &str, id: ContentId) -> ServiceResult<()> {
        let descriptor = resolve(type_name)?;
        let tx = self.conn.unchecked_transaction()?;
        let repo = SqliteContentRepository::new(&tx);
        if repo.get_owned_content(descriptor, id, author_id)?.is_none() {
            return Err(ServiceError::not_found(descriptor.model_type, id));
        }
        repo.delete_content(descriptor, id)?;
        tx.commit()?;

        info!(
            "event=content_delete module=service status=ok model_type={} id={} author_id={}",
            descriptor.model_type, id, author_id
        );
        Ok(())
    }

    fn check_realm_access(&self, realm_id: RealmId, author_id: AccountId) -> ServiceResult<()> {
        let realm = self
            .directory
            .get_realm_by_id(realm_id)?
            .ok_or_else(|| ServiceError::not_found("realm", realm_id))?;
        if realm.is_public {
            return Ok(());
        }
        if self.directory.get_membership(realm_id, author_id)?.is_none() {
            warn!(
                "event=content_create module=service status=denied realm_id={} author_id={}",
                realm_id, author_id
            );
            return Err(ServiceError::AccessDenied(format!(
                "account {author_id} is not a member of realm `{}`",
                realm.alias
            )));
        }
        Ok(())
    }

    fn notify_created(&self, author: &Account, descriptor: &ContentTypeDescriptor, item: &ContentItem) {
        let display_name = display_name(author);
        let link = self.public_base_url.map(|base| NotificationLink {
            label: RELATED_LINK_LABEL.to_string(),
            url: format!(
                "{}/{}/{}",
                base.trim_end_matches('/'),
                descriptor.type_name,
                item.alias
            ),
        });

        match self.reply_recipient(author.id, item) {
            Ok(Some(recipient)) => {
                self.fanout.dispatch(Notification {
                    recipient,
                    title: format!("{display_name} replied to you"),
                    body: format!("{display_name} replied to your post. Check it out!"),
                    link: link.clone(),
                });
            }
            Ok(None) => {}
            Err(err) => warn!(
                "event=notification_prepare module=service status=error kind=reply model_type={} id={} error={}",
                descriptor.model_type, item.id, err
            ),
        }

        match self.directory.list_followers(author.id) {
            Ok(followers) => {
                for follower in followers.into_iter().filter(|account| account.id != author.id) {
                    self.fanout.dispatch(Notification {
                        recipient: follower,
                        title: format!("{display_name} just posted"),
                        body: "An account you follow published something new. Check it out!"
                            .to_string(),
                        link: link.clone(),
                    });
                }
            }
            Err(err) => warn!(
                "event=notification_prepare module=service status=error kind=followers author_id={} error={}",
                author.id, err
            ),
        }
    }

    /// Author of the replied-to item, or `None` for non-replies and self-replies.
    fn reply_recipient(&self, author_id: AccountId, item: &ContentItem) -> ServiceResult<Option<Account>> {
        let target = match (item.reply_id, item.parent) {
            (Some(reply_id), _) => ContentRef::new(item.kind, reply_id),
            (None, Some(parent)) => parent,
            (None, None) => return Ok(None),
        };
        let target_descriptor = descriptor_for(target.kind);
        let target_item = SqliteContentRepository::new(self.conn)
            .get_content(target_descriptor, target.id)?
            .ok_or_else(|| {
                ServiceError::DanglingReference(format!(
                    "{}#{} is gone",
                    target_descriptor.table, target.id
                ))
            })?;
        if target_item.author_id == author_id {
            return Ok(None);
        }
        Ok(self.directory.get_account_by_id(target_item.author_id)?)
    }
}

fn display_name(account: &Account) -> &str {
    if account.nick.trim().is_empty() {
        &account.name
    } else {
        &account.nick
    }
}

fn require_non_blank(value: &str, field: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::ValidationFailed(format!("{field} is required")));
    }
    Ok(())
}

fn validate_alias(alias: &str) -> ServiceResult<String> {
    let trimmed = alias.trim();
    if !CONTENT_ALIAS_RE.is_match(trimmed) {
        return Err(ServiceError::ValidationFailed(format!(
            "invalid alias `{alias}`"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_heading(
    descriptor: &ContentTypeDescriptor,
    title: Option<&str>,
    description: Option<&str>,
) -> ServiceResult<(Option<String>, Option<String>)> {
    if !descriptor.has_title {
        if title.is_some() || description.is_some() {
            return Err(ServiceError::ValidationFailed(format!(
                "{} do not accept title or description",
                descriptor.type_name
            )));
        }
        return Ok((None, None));
    }

    let title = title.map(str::trim).unwrap_or_default();
    require_non_blank(title, "title")?;
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ServiceError::ValidationFailed(format!(
            "title exceeds {MAX_TITLE_CHARS} characters"
        )));
    }
    let description = description
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    Ok((Some(title.to_string()), description))
}

/// Checks parent/reply/repost references against capabilities and storage.
fn validate_references(
    repo: &SqliteContentRepository<'_>,
    descriptor: &ContentTypeDescriptor,
    draft: &ContentDraft,
) -> ServiceResult<()> {
    match (descriptor.has_parent, draft.parent) {
        (true, None) => {
            return Err(ServiceError::ValidationFailed(format!(
                "{} require a parent",
                descriptor.type_name
            )));
        }
        (false, Some(_)) => {
            return Err(ServiceError::ValidationFailed(format!(
                "{} cannot have a parent",
                descriptor.type_name
            )));
        }
        (true, Some(parent)) => {
            let parent_descriptor = descriptor_for(parent.kind);
            if !repo.content_exists(parent_descriptor, parent.id)? {
                return Err(ServiceError::not_found(parent_descriptor.model_type, parent.id));
            }
        }
        (false, None) => {}
    }

    for (target, allowed, relation) in [
        (draft.reply_to, descriptor.can_reply, "replied to"),
        (draft.repost_to, descriptor.can_repost, "reposted"),
    ] {
        let Some(target_id) = target else {
            continue;
        };
        if !allowed {
            return Err(ServiceError::ValidationFailed(format!(
                "{} cannot be {relation}",
                descriptor.type_name
            )));
        }
        if !repo.content_exists(descriptor, target_id)? {
            return Err(ServiceError::not_found(descriptor.model_type, target_id));
        }
    }
    Ok(())
}

/// Resolves categories (must exist), tags (get-or-create) and attachments.
fn resolve_links(
    conn: &Connection,
    categories: &[String],
    tags: &[String],
    attachments: &[String],
) -> ServiceResult<ContentLinks> {
    let taxonomy = SqliteTaxonomyRepository::new(conn);

    let mut category_ids = Vec::new();
    for alias in trim_category_aliases(categories).map_err(ServiceError::CategoryNotFound)? {
        let category = taxonomy
            .find_category(&alias)?
            .ok_or(ServiceError::CategoryNotFound(alias))?;
        category_ids.push(category.id);
    }

    let tag_aliases = normalize_aliases(tags)
        .map_err(|raw| ServiceError::ValidationFailed(format!("invalid tag alias `{raw}`")))?;
    let mut tag_ids = Vec::with_capacity(tag_aliases.len());
    for alias in tag_aliases {
        tag_ids.push(taxonomy.get_or_create_tag(&alias, &alias)?.id);
    }

    let mut attachment_ids = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        let trimmed = attachment.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::ValidationFailed(
                "attachment id cannot be blank".to_string(),
            ));
        }
        if !attachment_ids.iter().any(|existing: &String| existing == trimmed) {
            attachment_ids.push(trimmed.to_string());
        }
    }

    Ok(ContentLinks {
        category_ids,
        tag_ids,
        attachments: attachment_ids,
    })
}
