//! SQLite outbox sink.
//!
//! Persists notifications into `notification_outbox` over a dedicated
//! connection, so delivery never contends with the request connection's
//! transactions.

use crate::db::{now_epoch_ms, open_db, open_db_in_memory, DbResult};
use crate::model::content::AccountId;
use crate::notify::{DeliveryError, Notification, NotificationLink, NotificationSink};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// One persisted notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    pub id: i64,
    pub recipient_id: AccountId,
    pub title: String,
    pub body: String,
    pub link: Option<NotificationLink>,
    pub created_at: i64,
}

/// Sink writing one outbox row per notification.
pub struct SqliteOutboxSink {
    conn: Mutex<Connection>,
}

impl SqliteOutboxSink {
    /// Opens (and migrates) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self {
            conn: Mutex::new(open_db(path)?),
        })
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self {
            conn: Mutex::new(open_db_in_memory()?),
        })
    }

    /// Entries addressed to `recipient_id`, oldest first.
    pub fn entries_for(&self, recipient_id: AccountId) -> Result<Vec<OutboxEntry>, DeliveryError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, recipient_id, title, body, link_label, link_url, created_at
                 FROM notification_outbox
                 WHERE recipient_id = ?1
                 ORDER BY id ASC;",
            )
            .map_err(unavailable)?;
        let rows = stmt
            .query_map([recipient_id], |row| {
                let label: Option<String> = row.get("link_label")?;
                let url: Option<String> = row.get("link_url")?;
                Ok(OutboxEntry {
                    id: row.get("id")?,
                    recipient_id: row.get("recipient_id")?,
                    title: row.get("title")?,
                    body: row.get("body")?,
                    link: label.zip(url).map(|(label, url)| NotificationLink { label, url }),
                    created_at: row.get("created_at")?,
                })
            })
            .map_err(unavailable)?;
        let entries = rows.collect::<Result<Vec<_>, _>>().map_err(unavailable)?;
        Ok(entries)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DeliveryError> {
        self.conn
            .lock()
            .map_err(|_| DeliveryError::Unavailable("outbox connection lock poisoned".to_string()))
    }
}

impl NotificationSink for SqliteOutboxSink {
    fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let conn = self.lock()?;
        let (label, url) = match &notification.link {
            Some(link) => (Some(link.label.as_str()), Some(link.url.as_str())),
            None => (None, None),
        };
        conn.execute(
            "INSERT INTO notification_outbox
                (recipient_id, title, body, link_label, link_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                notification.recipient.id,
                notification.title,
                notification.body,
                label,
                url,
                now_epoch_ms()
            ],
        )
        .map_err(unavailable)?;
        Ok(())
    }
}

fn unavailable(err: rusqlite::Error) -> DeliveryError {
    DeliveryError::Unavailable(err.to_string())
}
