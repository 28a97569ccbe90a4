//! Snapshot repository port — write-through persistence of device snapshots.
//!
//! The in-memory telemetry store is authoritative while the process runs.
//! The repository keeps the latest snapshot of every device so state
//! (including a pour in progress) survives a restart.

use std::future::Future;

use harvestguard_domain::error::HarvestGuardError;
use harvestguard_domain::id::DeviceId;
use harvestguard_domain::snapshot::DeviceSnapshot;
use harvestguard_domain::time::Timestamp;

/// Repository for persisting [`DeviceSnapshot`]s, keyed by device id.
pub trait SnapshotRepository {
    /// Insert or replace the snapshot of a device.
    ///
    /// `saved_at` comes from the engine clock, so every write of one
    /// operation carries the same time as its events.
    fn save(
        &self,
        snapshot: DeviceSnapshot,
        saved_at: Timestamp,
    ) -> impl Future<Output = Result<DeviceSnapshot, HarvestGuardError>> + Send;

    /// Get the stored snapshot of a device, if any.
    fn get(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceSnapshot>, HarvestGuardError>> + Send;

    /// Get every stored snapshot.
    fn get_all(&self)
    -> impl Future<Output = Result<Vec<DeviceSnapshot>, HarvestGuardError>> + Send;

    /// Delete the snapshot of a device. Deleting a missing device is not an error.
    fn delete(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<(), HarvestGuardError>> + Send;
}

impl<T: SnapshotRepository + Send + Sync> SnapshotRepository for std::sync::Arc<T> {
    fn save(
        &self,
        snapshot: DeviceSnapshot,
        saved_at: Timestamp,
    ) -> impl Future<Output = Result<DeviceSnapshot, HarvestGuardError>> + Send {
        (**self).save(snapshot, saved_at)
    }

    fn get(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceSnapshot>, HarvestGuardError>> + Send {
        (**self).get(device_id)
    }

    fn get_all(
        &self,
    ) -> impl Future<Output = Result<Vec<DeviceSnapshot>, HarvestGuardError>> + Send {
        (**self).get_all()
    }

    fn delete(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<(), HarvestGuardError>> + Send {
        (**self).delete(device_id)
    }
}
