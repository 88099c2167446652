//! Explicitly constructed core context.
//!
//! # Responsibility
//! - Own the request connection, configuration and notification fan-out.
//! - Hand out services borrowing those resources.
//! - Tear the fan-out down deterministically.
//!
//! # Invariants
//! - There is no process-global storage handle; every service borrows from
//!   one `CoreContext`.
//! - Services are cheap views and can be created per request.

use crate::config::{ConfigError, CoreConfig};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::notify::{NotificationFanout, NotificationSink};
use crate::repo::directory_repo::SqliteDirectory;
use crate::service::{ContentService, FeedService, ReactionService};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// Context construction failure.
#[derive(Debug)]
pub enum ContextError {
    Config(ConfigError),
    Db(DbError),
    /// Fan-out runtime could not start.
    Runtime(std::io::Error),
}

impl Display for ContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Runtime(err) => write!(f, "failed to start notification runtime: {err}"),
        }
    }
}

impl Error for ContextError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Runtime(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ContextError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for ContextError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Owner of core resources for one process or test.
pub struct CoreContext {
    conn: Connection,
    config: CoreConfig,
    fanout: NotificationFanout,
}

impl CoreContext {
    /// Opens storage per `config.db_path` and starts the fan-out pool.
    pub fn open(config: CoreConfig, sink: Arc<dyn NotificationSink>) -> Result<Self, ContextError> {
        config.validate()?;
        let conn = match &config.db_path {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        Self::with_connection(conn, config, sink)
    }

    /// In-memory storage regardless of `config.db_path`.
    pub fn open_in_memory(
        config: CoreConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, ContextError> {
        config.validate()?;
        Self::with_connection(open_db_in_memory()?, config, sink)
    }

    fn with_connection(
        conn: Connection,
        config: CoreConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, ContextError> {
        let fanout =
            NotificationFanout::new(config.fanout_settings(), sink).map_err(ContextError::Runtime)?;
        info!(
            "event=context_open module=core status=ok persistent={}",
            config.db_path.is_some()
        );
        Ok(Self {
            conn,
            config,
            fanout,
        })
    }

    /// Request connection; also used to seed collaborator tables.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn fanout(&self) -> &NotificationFanout {
        &self.fanout
    }

    pub fn directory(&self) -> SqliteDirectory<'_> {
        SqliteDirectory::new(&self.conn)
    }

    pub fn feed(&self) -> FeedService<'_, SqliteDirectory<'_>> {
        FeedService::new(&self.conn, self.directory())
    }

    pub fn content(&self) -> ContentService<'_, SqliteDirectory<'_>> {
        ContentService::new(
            &self.conn,
            self.directory(),
            &self.fanout,
            self.config.public_base_url.as_deref(),
        )
    }

    pub fn reactions(&self) -> ReactionService<'_> {
        ReactionService::new(&self.conn)
    }

    /// Drains notifications for up to `grace`, then drops everything.
    pub fn shutdown(self, grace: Duration) {
        self.fanout.shutdown(grace);
        info!("event=context_close module=core status=ok");
    }
}
