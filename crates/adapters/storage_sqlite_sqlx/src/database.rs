//! Snapshot database: connection pool, schema migration and repository access.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::StorageError;
use crate::snapshot_repo::SqliteSnapshotRepository;

/// A writer holding the file lock makes others wait this long before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Open, migrated snapshot database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database at `url` and bring its schema up to date.
    ///
    /// The file is created when missing. `sqlite::memory:` gives a private
    /// database shared by every connection of this pool.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidUrl`] for a malformed URL,
    /// [`StorageError::Connect`] when the file cannot be opened, or
    /// [`StorageError::Migration`] when the schema cannot be applied.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|source| StorageError::InvalidUrl {
                url: url.to_string(),
                source,
            })?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);

        tracing::info!(max_connections, "opening snapshot database");
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("snapshot schema up to date");

        Ok(Self { pool })
    }

    /// Repository over this database's snapshot table.
    #[must_use]
    pub fn snapshots(&self) -> SqliteSnapshotRepository {
        SqliteSnapshotRepository::new(self.pool.clone())
    }

    /// Wait for in-flight queries and close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
