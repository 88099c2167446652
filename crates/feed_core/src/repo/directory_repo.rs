//! Narrow read interfaces onto collaborator-owned records.
//!
//! # Responsibility
//! - Define the account/realm/follow contracts the core consumes.
//! - Provide a SQLite implementation reading the collaborator tables.
//!
//! # Invariants
//! - Implementations never mutate accounts, realms, memberships or follows.
//! - Lookup misses are `Ok(None)`, not errors.

use crate::model::content::{AccountId, RealmId};
use crate::model::directory::{Account, Membership, Realm};
use crate::repo::RepoResult;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub trait AccountStore {
    fn get_account_by_id(&self, id: AccountId) -> RepoResult<Option<Account>>;
    fn get_account_by_handle(&self, handle: &str) -> RepoResult<Option<Account>>;
}

pub trait RealmStore {
    fn get_realm_by_id(&self, id: RealmId) -> RepoResult<Option<Realm>>;
    fn get_membership(
        &self,
        realm_id: RealmId,
        account_id: AccountId,
    ) -> RepoResult<Option<Membership>>;
}

pub trait FollowStore {
    /// Accounts following `account_id`.
    fn list_followers(&self, account_id: AccountId) -> RepoResult<Vec<Account>>;
}

/// Everything the content service needs from collaborators.
pub trait Directory: AccountStore + RealmStore + FollowStore {}

impl<T: AccountStore + RealmStore + FollowStore> Directory for T {}

/// SQLite-backed collaborator directory.
#[derive(Clone, Copy)]
pub struct SqliteDirectory<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDirectory<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

const ACCOUNT_COLUMNS: &str = "accounts.id, accounts.name, accounts.nick, accounts.avatar, accounts.description";

impl AccountStore for SqliteDirectory<'_> {
    fn get_account_by_id(&self, id: AccountId) -> RepoResult<Option<Account>> {
        let account = self
            .conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE accounts.id = ?1;"),
                [id],
                parse_account_row,
            )
            .optional()?;
        Ok(account)
    }

    fn get_account_by_handle(&self, handle: &str) -> RepoResult<Option<Account>> {
        let account = self
            .conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE accounts.name = ?1;"),
                [handle],
                parse_account_row,
            )
            .optional()?;
        Ok(account)
    }
}

impl RealmStore for SqliteDirectory<'_> {
    fn get_realm_by_id(&self, id: RealmId) -> RepoResult<Option<Realm>> {
        let realm = self
            .conn
            .query_row(
                "SELECT id, alias, name, is_public FROM realms WHERE id = ?1;",
                [id],
                |row| {
                    Ok(Realm {
                        id: row.get("id")?,
                        alias: row.get("alias")?,
                        name: row.get("name")?,
                        is_public: row.get::<_, i64>("is_public")? == 1,
                    })
                },
            )
            .optional()?;
        Ok(realm)
    }

    fn get_membership(
        &self,
        realm_id: RealmId,
        account_id: AccountId,
    ) -> RepoResult<Option<Membership>> {
        let membership = self
            .conn
            .query_row(
                "SELECT realm_id, account_id, power_level
                 FROM realm_members
                 WHERE realm_id = ?1 AND account_id = ?2;",
                params![realm_id, account_id],
                |row| {
                    Ok(Membership {
                        realm_id: row.get("realm_id")?,
                        account_id: row.get("account_id")?,
                        power_level: row.get("power_level")?,
                    })
                },
            )
            .optional()?;
        Ok(membership)
    }
}

impl FollowStore for SqliteDirectory<'_> {
    fn list_followers(&self, account_id: AccountId) -> RepoResult<Vec<Account>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS}
             FROM account_follows f
             INNER JOIN accounts ON accounts.id = f.follower_id
             WHERE f.following_id = ?1
             ORDER BY accounts.id ASC;"
        ))?;
        let mut rows = stmt.query([account_id])?;
        let mut followers = Vec::new();
        while let Some(row) = rows.next()? {
            followers.push(parse_account_row(row)?);
        }
        Ok(followers)
    }
}

fn parse_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        nick: row.get(2)?,
        avatar: row.get(3)?,
        description: row.get(4)?,
    })
}
