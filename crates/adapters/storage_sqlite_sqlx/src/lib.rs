//! # harvestguard-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `SnapshotRepository` port defined in `harvestguard-app::ports`
//! - Open the `SQLite` connection pool and close it on shutdown
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain snapshots and database rows
//!
//! ## Dependency rule
//! Depends on `harvestguard-app` (for port traits) and `harvestguard-domain`
//! (for domain types). The `app` and `domain` crates must never reference
//! this adapter.

mod database;
mod error;
mod snapshot_repo;

pub use database::Database;
pub use error::StorageError;
pub use snapshot_repo::SqliteSnapshotRepository;
