//! Database connection management

use crate::error::{Error, Result};
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::migrations;

const IN_MEMORY_PATH: &str = ":memory:";

/// Remote primary for an embedded libSQL replica
#[derive(Clone, Default)]
pub struct ReplicaConfig {
    /// Remote database URL (e.g., `libsql://your-db.turso.io`)
    pub url: Option<String>,
    /// Authentication token for the remote database
    pub auth_token: Option<String>,
    /// Automatic sync interval; `None` syncs only on open
    pub sync_interval: Option<Duration>,
}

impl ReplicaConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            auth_token: Some(auth_token.into()),
            sync_interval: Some(Duration::from_secs(60)),
        }
    }

    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    pub const fn is_configured(&self) -> bool {
        self.url.is_some() && self.auth_token.is_some()
    }
}

impl fmt::Debug for ReplicaConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReplicaConfig")
            .field("url", &self.url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("sync_interval", &self.sync_interval)
            .finish()
    }
}

/// Where the note store keeps its data.
///
/// Passed explicitly to [`Database::connect`]; nothing is read from the
/// process environment at this layer.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Local database file, or `:memory:`
    pub path: PathBuf,
    /// Optional remote primary; requires a file path
    pub replica: Option<ReplicaConfig>,
}

impl StoreConfig {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            replica: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::local(IN_MEMORY_PATH)
    }

    #[must_use]
    pub fn with_replica(mut self, replica: ReplicaConfig) -> Self {
        self.replica = Some(replica);
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == IN_MEMORY_PATH
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::local("notesync.db")
    }
}

/// Database wrapper for libSQL connections
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    replicated: bool,
}

impl Database {
    /// Open whatever `config` describes and run migrations.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        match (&config.replica, config.is_in_memory()) {
            (Some(_), true) => Err(Error::InvalidInput(
                "An embedded replica needs a database file, not :memory:".into(),
            )),
            (Some(replica), false) => Self::open_with_sync(&config.path, replica.clone()).await,
            (None, true) => Self::open_in_memory().await,
            (None, false) => Self::open(&config.path).await,
        }
    }

    /// Open a local-only database at the given path, creating it if it doesn't exist
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        Self::initialise(db, false).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(IN_MEMORY_PATH).build().await?;
        Self::initialise(db, false).await
    }

    /// Open a local file that replicates from a remote libSQL primary.
    ///
    /// Reads are served locally; writes go to the primary and sync back.
    pub async fn open_with_sync(local_path: impl AsRef<Path>, replica: ReplicaConfig) -> Result<Self> {
        let path_str = local_path.as_ref().to_string_lossy().to_string();

        let url = replica
            .url
            .clone()
            .ok_or_else(|| Error::InvalidInput("Replica URL is required".into()))?;
        let token = replica
            .auth_token
            .clone()
            .ok_or_else(|| Error::InvalidInput("Replica auth token is required".into()))?;

        let mut builder = Builder::new_remote_replica(path_str, url, token);
        if let Some(interval) = replica.sync_interval {
            builder = builder.sync_interval(interval);
            tracing::debug!("Automatic replica sync interval set to {:?}", interval);
        }

        let db = builder.build().await?;
        tracing::debug!("Performing initial replica sync...");
        db.sync().await?;
        Self::initialise(db, true).await
    }

    async fn initialise(db: LibSqlDatabase, replicated: bool) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self {
            db,
            conn,
            replicated,
        };
        database.configure().await?;
        migrations::run(&database.conn).await?;
        Ok(database)
    }

    async fn configure(&self) -> Result<()> {
        // Pragmas that replicas reject are best-effort
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA busy_timeout = 5000;", ())
            .await
            .ok();
        Ok(())
    }

    /// Pull from the remote primary, if replicated
    pub async fn sync(&self) -> Result<()> {
        if self.replicated {
            self.db.sync().await?;
            tracing::debug!("Database synced with remote");
        }
        Ok(())
    }

    pub const fn is_replicated(&self) -> bool {
        self.replicated
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
