#![allow(dead_code)]

use feed_core::{
    AccountId, ContentDraft, ContentKind, ContentRef, CoreConfig, CoreContext, DeliveryError,
    Notification, NotificationSink, RealmId,
};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sink that keeps every notification in memory.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient_id: AccountId) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|notification| notification.recipient.id == recipient_id)
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub fn context() -> CoreContext {
    context_with_recorder().0
}

pub fn context_with_recorder() -> (CoreContext, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let config = CoreConfig {
        public_base_url: Some("https://feed.example".to_string()),
        ..CoreConfig::default()
    };
    let ctx = CoreContext::open_in_memory(config, sink.clone()).unwrap();
    (ctx, sink)
}

/// Waits for in-flight notification jobs.
pub fn drain(ctx: &CoreContext) {
    assert!(ctx.fanout().drain(Duration::from_secs(5)));
}

pub fn seed_account(conn: &Connection, name: &str) -> AccountId {
    conn.execute(
        "INSERT INTO accounts (name, nick) VALUES (?1, ?2);",
        params![name, name.to_uppercase()],
    )
    .unwrap();
    conn.last_insert_rowid()
}

pub fn seed_realm(conn: &Connection, alias: &str, is_public: bool) -> RealmId {
    conn.execute(
        "INSERT INTO realms (alias, name, is_public) VALUES (?1, ?1, ?2);",
        params![alias, is_public as i64],
    )
    .unwrap();
    conn.last_insert_rowid()
}

pub fn seed_member(conn: &Connection, realm_id: RealmId, account_id: AccountId) {
    conn.execute(
        "INSERT INTO realm_members (realm_id, account_id) VALUES (?1, ?2);",
        params![realm_id, account_id],
    )
    .unwrap();
}

pub fn seed_follow(conn: &Connection, follower_id: AccountId, following_id: AccountId) {
    conn.execute(
        "INSERT INTO account_follows (follower_id, following_id) VALUES (?1, ?2);",
        params![follower_id, following_id],
    )
    .unwrap();
}

pub fn seed_category(conn: &Connection, alias: &str) -> i64 {
    conn.execute(
        "INSERT INTO categories (alias, name) VALUES (?1, ?1);",
        params![alias],
    )
    .unwrap();
    conn.last_insert_rowid()
}

/// Overrides `created_at` so ordering assertions do not depend on the clock.
pub fn set_created_at(conn: &Connection, table: &str, id: i64, created_at: i64) {
    conn.execute(
        &format!("UPDATE {table} SET created_at = ?1 WHERE id = ?2;"),
        params![created_at, id],
    )
    .unwrap();
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

pub fn moment(content: &str) -> ContentDraft {
    ContentDraft {
        content: content.to_string(),
        ..ContentDraft::default()
    }
}

pub fn article(title: &str, content: &str) -> ContentDraft {
    ContentDraft {
        title: Some(title.to_string()),
        content: content.to_string(),
        ..ContentDraft::default()
    }
}

pub fn comment_on(kind: ContentKind, id: i64, content: &str) -> ContentDraft {
    ContentDraft {
        content: content.to_string(),
        parent: Some(ContentRef::new(kind, id)),
        ..ContentDraft::default()
    }
}
