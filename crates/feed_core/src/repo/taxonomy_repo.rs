//! Category/tag lookups used by content mutations.
//!
//! # Responsibility
//! - Resolve categories by alias (never created implicitly).
//! - Get-or-create tags by alias.
//! - Normalize and validate alias input.
//!
//! # Invariants
//! - Aliases are trimmed, lowercased and deduplicated before lookup.
//! - Tag creation is idempotent on alias uniqueness.

use crate::model::directory::{Category, Tag};
use crate::repo::RepoResult;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;

static TAXONOMY_ALIAS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{0,63}$").expect("valid taxonomy alias regex"));

/// Repository interface for category/tag resolution.
pub trait TaxonomyRepository {
    fn find_category(&self, alias: &str) -> RepoResult<Option<Category>>;
    fn find_tag(&self, alias: &str) -> RepoResult<Option<Tag>>;
    /// Returns the tag with `alias`, inserting it first when absent.
    fn get_or_create_tag(&self, alias: &str, name: &str) -> RepoResult<Tag>;
}

/// SQLite-backed taxonomy repository.
pub struct SqliteTaxonomyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaxonomyRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TaxonomyRepository for SqliteTaxonomyRepository<'_> {
    fn find_category(&self, alias: &str) -> RepoResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, alias, name FROM categories WHERE alias = ?1;",
                [alias],
                |row| {
                    Ok(Category {
                        id: row.get("id")?,
                        alias: row.get("alias")?,
                        name: row.get("name")?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    fn find_tag(&self, alias: &str) -> RepoResult<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                "SELECT id, alias, name FROM tags WHERE alias = ?1;",
                [alias],
                |row| {
                    Ok(Tag {
                        id: row.get("id")?,
                        alias: row.get("alias")?,
                        name: row.get("name")?,
                    })
                },
            )
            .optional()?;
        Ok(tag)
    }

    fn get_or_create_tag(&self, alias: &str, name: &str) -> RepoResult<Tag> {
        self.conn.execute(
            "INSERT OR IGNORE INTO tags (alias, name) VALUES (?1, ?2);",
            params![alias, name],
        )?;
        let tag = self.conn.query_row(
            "SELECT id, alias, name FROM tags WHERE alias = ?1;",
            [alias],
            |row| {
                Ok(Tag {
                    id: row.get("id")?,
                    alias: row.get("alias")?,
                    name: row.get("name")?,
                })
            },
        )?;
        Ok(tag)
    }
}

/// Normalizes one alias; `None` for blank input.
pub fn normalize_alias(alias: &str) -> Option<String> {
    let trimmed = alias.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Returns whether a normalized alias has an accepted format.
pub fn is_valid_taxonomy_alias(alias: &str) -> bool {
    TAXONOMY_ALIAS_RE.is_match(alias)
}

/// Normalizes and deduplicates aliases, rejecting blank or malformed values.
///
/// Returns the first offending raw value on error.
pub fn normalize_aliases(aliases: &[String]) -> Result<Vec<String>, String> {
    let mut unique = BTreeSet::new();
    for alias in aliases {
        match normalize_alias(alias) {
            Some(value) if is_valid_taxonomy_alias(&value) => {
                unique.insert(value);
            }
            _ => return Err(alias.clone()),
        }
    }
    Ok(unique.into_iter().collect())
}

/// Trims and deduplicates category aliases, keeping their case.
///
/// Categories are owned elsewhere, so lookups match the stored alias exactly.
/// Returns the first blank raw value on error.
pub fn trim_category_aliases(aliases: &[String]) -> Result<Vec<String>, String> {
    let mut unique = BTreeSet::new();
    for alias in aliases {
        let trimmed = alias.trim();
        if trimmed.is_empty() {
            return Err(alias.clone());
        }
        unique.insert(trimmed.to_string());
    }
    Ok(unique.into_iter().collect())
}
