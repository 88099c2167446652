//! Content type registry.
//!
//! # Responsibility
//! - Map public type selectors (`articles|moments|comments`) to storage
//!   descriptors.
//! - Be the only source of table/column identifiers used in generated SQL.
//!
//! # Invariants
//! - Descriptors are static; identifiers never come from caller input.
//! - Unknown selectors fail with `InvalidContentType`.

use crate::model::content::ContentKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Public selector for articles.
pub const CONTENT_TYPE_ARTICLES: &str = "articles";
/// Public selector for moments.
pub const CONTENT_TYPE_MOMENTS: &str = "moments";
/// Public selector for comments.
pub const CONTENT_TYPE_COMMENTS: &str = "comments";

/// Storage and capability description of one content variant.
#[derive(Debug, PartialEq, Eq)]
pub struct ContentTypeDescriptor {
    pub kind: ContentKind,
    /// Public selector.
    pub type_name: &'static str,
    /// Feed `model_type` tag.
    pub model_type: &'static str,
    pub table: &'static str,
    /// Column naming this variant in reactions, comments and join tables.
    pub fk_column: &'static str,
    pub category_link_table: &'static str,
    pub tag_link_table: &'static str,
    pub attachment_table: &'static str,
    /// Table carries `title` and `description`.
    pub has_title: bool,
    /// Table carries `article_id|moment_id|comment_id` parent columns.
    pub has_parent: bool,
    pub can_reply: bool,
    pub can_repost: bool,
    /// Participates in the unified feed.
    pub in_feed: bool,
    /// Feed projection carries the full body instead of title/description.
    pub feed_includes_body: bool,
}

static ARTICLES: ContentTypeDescriptor = ContentTypeDescriptor {
    kind: ContentKind::Article,
    type_name: CONTENT_TYPE_ARTICLES,
    model_type: "article",
    table: "articles",
    fk_column: "article_id",
    category_link_table: "article_categories",
    tag_link_table: "article_tags",
    attachment_table: "article_attachments",
    has_title: true,
    has_parent: false,
    can_reply: false,
    can_repost: false,
    in_feed: true,
    feed_includes_body: false,
};

static MOMENTS: ContentTypeDescriptor = ContentTypeDescriptor {
    kind: ContentKind::Moment,
    type_name: CONTENT_TYPE_MOMENTS,
    model_type: "moment",
    table: "moments",
    fk_column: "moment_id",
    category_link_table: "moment_categories",
    tag_link_table: "moment_tags",
    attachment_table: "moment_attachments",
    has_title: false,
    has_parent: false,
    can_reply: false,
    can_repost: true,
    in_feed: true,
    feed_includes_body: true,
};

static COMMENTS: ContentTypeDescriptor = ContentTypeDescriptor {
    kind: ContentKind::Comment,
    type_name: CONTENT_TYPE_COMMENTS,
    model_type: "comment",
    table: "comments",
    fk_column: "comment_id",
    category_link_table: "comment_categories",
    tag_link_table: "comment_tags",
    attachment_table: "comment_attachments",
    has_title: false,
    has_parent: true,
    can_reply: true,
    can_repost: false,
    in_feed: false,
    feed_includes_body: true,
};

static DESCRIPTORS: [&ContentTypeDescriptor; 3] = [&ARTICLES, &MOMENTS, &COMMENTS];

/// Registry lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidContentType(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidContentType(value) => write!(f, "invalid content type: `{value}`"),
        }
    }
}

impl Error for RegistryError {}

/// Resolves a public selector. Matching is exact; no trimming or case folding.
pub fn resolve(type_name: &str) -> Result<&'static ContentTypeDescriptor, RegistryError> {
    DESCRIPTORS
        .iter()
        .copied()
        .find(|descriptor| descriptor.type_name == type_name)
        .ok_or_else(|| RegistryError::InvalidContentType(type_name.to_string()))
}

/// Returns the descriptor of a known variant.
pub fn descriptor_for(kind: ContentKind) -> &'static ContentTypeDescriptor {
    match kind {
        ContentKind::Article => &ARTICLES,
        ContentKind::Moment => &MOMENTS,
        ContentKind::Comment => &COMMENTS,
    }
}

/// All descriptors in registry order.
pub fn descriptors() -> impl Iterator<Item = &'static ContentTypeDescriptor> {
    DESCRIPTORS.iter().copied()
}

/// Descriptors that participate in the unified feed.
pub fn feed_descriptors() -> impl Iterator<Item = &'static ContentTypeDescriptor> {
    descriptors().filter(|descriptor| descriptor.in_feed)
}

/// Parent-column names on the comments table, in registry order.
pub fn parent_columns() -> [&'static str; 3] {
    [ARTICLES.fk_column, MOMENTS.fk_column, COMMENTS.fk_column]
}
