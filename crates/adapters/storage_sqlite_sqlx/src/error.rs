//! Errors of the `SQLite` snapshot store.

use harvestguard_domain::error::HarvestGuardError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The connection URL could not be parsed.
    #[error("invalid database url {url:?}")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("unable to open database")]
    Connect(#[source] sqlx::Error),

    /// A statement failed, or a stored row no longer decodes into a snapshot.
    #[error("snapshot query failed")]
    Query(#[from] sqlx::Error),

    #[error("unable to migrate snapshot schema")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for HarvestGuardError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
