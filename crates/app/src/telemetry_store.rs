//! Telemetry store — latest reading and actuator state per device.
//!
//! The map itself sits behind a short-lived [`RwLock`]; each device record
//! sits behind its own async [`Mutex`], held for a whole
//! read-decide-write-persist sequence. Global operations copy the record
//! handles out of the map first and then lock one device at a time, so a
//! slow device never blocks the others.
//!
//! A removed record is flagged as retired before it leaves the map. A task
//! that was already waiting on its lock sees the flag and starts over with a
//! fresh record instead of writing into a detached one.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{Mutex, OwnedMutexGuard};

use harvestguard_domain::actuator::{ActuatorState, TargetMoisture};
use harvestguard_domain::id::DeviceId;
use harvestguard_domain::snapshot::DeviceSnapshot;
use harvestguard_domain::telemetry::{DeviceTelemetry, TelemetryReading};
use harvestguard_domain::time::Timestamp;

/// Everything the engine knows about one device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub telemetry: DeviceTelemetry,
    pub actuator: ActuatorState,
    retired: bool,
}

impl DeviceRecord {
    /// A device seen for the first time: no reading yet, drying.
    #[must_use]
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            telemetry: DeviceTelemetry::new(device_id),
            actuator: ActuatorState::default(),
            retired: false,
        }
    }

    /// Rebuild a record from a persisted snapshot.
    ///
    /// The online flag is not restored: the device stays offline until the
    /// next watchdog sweep classifies it.
    #[must_use]
    pub fn from_snapshot(snapshot: &DeviceSnapshot) -> Self {
        let mut telemetry = DeviceTelemetry::new(snapshot.device_id.clone());
        if let Some(at) = snapshot.last_update_at {
            let reading = TelemetryReading {
                temperature: snapshot.temperature,
                humidity: snapshot.humidity,
                is_rain_detected: snapshot.is_rain_detected,
                is_sunny: snapshot.is_sunny,
            };
            telemetry.record(reading, None, at);
        }
        Self {
            telemetry,
            actuator: snapshot.actuator(),
            retired: false,
        }
    }

    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        self.telemetry.device_id()
    }

    #[must_use]
    pub fn snapshot(&self, target: TargetMoisture) -> DeviceSnapshot {
        DeviceSnapshot::new(&self.telemetry, self.actuator, target)
    }
}

/// Exclusive access to one device record.
pub type DeviceHandle = OwnedMutexGuard<DeviceRecord>;

type Slot = Arc<Mutex<DeviceRecord>>;

/// Shared, per-device-locked map of [`DeviceRecord`]s.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    devices: RwLock<HashMap<DeviceId, Slot>>,
}

impl TelemetryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<DeviceId, Slot>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<DeviceId, Slot>> {
        self.devices.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, device_id: &DeviceId) -> Option<Slot> {
        self.read().get(device_id).cloned()
    }

    fn slot_or_insert(&self, device_id: &DeviceId) -> (Slot, bool) {
        if let Some(slot) = self.slot(device_id) {
            return (slot, false);
        }
        let mut devices = self.write();
        match devices.get(device_id) {
            Some(slot) => (Arc::clone(slot), false),
            None => {
                let slot = Arc::new(Mutex::new(DeviceRecord::new(device_id.clone())));
                devices.insert(device_id.clone(), Arc::clone(&slot));
                (slot, true)
            }
        }
    }

    /// Lock a device, creating an empty record on first sight.
    ///
    /// Returns the handle and whether the record was created by this call.
    /// A created record that the caller fails to fill should be
    /// [`remove`](Self::remove)d before the handle is released.
    pub async fn entry(&self, device_id: &DeviceId) -> (DeviceHandle, bool) {
        loop {
            let (slot, created) = self.slot_or_insert(device_id);
            let handle = slot.lock_owned().await;
            if handle.retired {
                continue;
            }
            return (handle, created);
        }
    }

    /// Record a reading ingested at `at`, creating the device on first sight.
    ///
    /// Returns the locked record and whether it was created by this call.
    pub async fn upsert(
        &self,
        device_id: &DeviceId,
        reading: TelemetryReading,
        reported_at: Option<Timestamp>,
        at: Timestamp,
    ) -> (DeviceHandle, bool) {
        let (mut handle, created) = self.entry(device_id).await;
        handle.telemetry.record(reading, reported_at, at);
        (handle, created)
    }

    /// Lock a device for a read-modify-write sequence.
    pub async fn lock(&self, device_id: &DeviceId) -> Option<DeviceHandle> {
        let slot = self.slot(device_id)?;
        let handle = slot.lock_owned().await;
        (!handle.retired).then_some(handle)
    }

    /// Copy of the current record of a device.
    pub async fn get(&self, device_id: &DeviceId) -> Option<DeviceRecord> {
        self.lock(device_id).await.map(|handle| handle.clone())
    }

    /// Copy of every known record. Ordering is unspecified.
    pub async fn list_all(&self) -> Vec<DeviceRecord> {
        let slots: Vec<Slot> = self.read().values().cloned().collect();
        let mut records = Vec::with_capacity(slots.len());
        for slot in slots {
            let record = slot.lock().await;
            if !record.retired {
                records.push(record.clone());
            }
        }
        records
    }

    /// Ids of every known device.
    #[must_use]
    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Retire a locked device and drop it from the map.
    ///
    /// The caller keeps the handle until it has finished cleaning up; tasks
    /// waiting on the same device start over once it is released.
    pub fn remove(&self, handle: &mut DeviceHandle) {
        handle.retired = true;
        let slot = OwnedMutexGuard::mutex(handle);
        let mut devices = self.write();
        if devices
            .get(handle.device_id())
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            devices.remove(handle.device_id());
        }
    }

    /// Insert a record unless the device is already known.
    ///
    /// Returns `true` when the record was inserted.
    pub fn restore(&self, record: DeviceRecord) -> bool {
        let mut devices = self.write();
        if devices.contains_key(record.device_id()) {
            return false;
        }
        devices.insert(record.device_id().clone(), Arc::new(Mutex::new(record)));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvestguard_domain::actuator::DryingPhase;
    use harvestguard_domain::time::{now, seconds};

    fn dryer(id: &str) -> DeviceId {
        DeviceId::new(id).unwrap()
    }

    fn reading(humidity: f64) -> TelemetryReading {
        TelemetryReading {
            temperature: 38.0,
            humidity,
            is_rain_detected: false,
            is_sunny: true,
        }
    }

    #[tokio::test]
    async fn should_create_record_when_device_seen_first_time() {
        let store = TelemetryStore::new();
        let at = now();

        let (handle, created) = store.upsert(&dryer("a"), reading(18.0), None, at).await;

        assert!(created);
        assert_eq!(handle.telemetry.last_update_at(), Some(at));
        assert_eq!(handle.actuator.phase(), DryingPhase::Drying);
        assert!(!handle.telemetry.is_online());
    }

    #[tokio::test]
    async fn should_refresh_last_update_when_device_reports_again() {
        let store = TelemetryStore::new();
        let first = now();
        let second = first + seconds(10);

        drop(store.upsert(&dryer("a"), reading(18.0), None, first).await);
        let (handle, created) = store.upsert(&dryer("a"), reading(17.5), None, second).await;

        assert!(!created);
        assert_eq!(handle.telemetry.last_update_at(), Some(second));
        assert!((handle.telemetry.reading().humidity - 17.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn should_create_empty_record_when_entry_seen_first_time() {
        let store = TelemetryStore::new();

        let (handle, created) = store.entry(&dryer("a")).await;
        assert!(created);
        assert_eq!(handle.telemetry.last_update_at(), None);
        drop(handle);

        let (_, created) = store.entry(&dryer("a")).await;
        assert!(!created);
    }

    #[tokio::test]
    async fn should_return_none_when_device_unknown() {
        let store = TelemetryStore::new();
        assert!(store.get(&dryer("ghost")).await.is_none());
        assert!(store.lock(&dryer("ghost")).await.is_none());
    }

    #[tokio::test]
    async fn should_list_every_known_device() {
        let store = TelemetryStore::new();
        for id in ["a", "b", "c"] {
            drop(store.upsert(&dryer(id), reading(18.0), None, now()).await);
        }

        let mut ids: Vec<String> = store
            .list_all()
            .await
            .iter()
            .map(|r| r.device_id().to_string())
            .collect();
        ids.sort();

        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn should_forget_device_when_removed() {
        let store = TelemetryStore::new();
        drop(store.upsert(&dryer("a"), reading(18.0), None, now()).await);

        let mut handle = store.lock(&dryer("a")).await.unwrap();
        store.remove(&mut handle);
        drop(handle);

        assert!(store.get(&dryer("a")).await.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn should_start_fresh_record_when_upsert_waited_on_removed_device() {
        let store = Arc::new(TelemetryStore::new());
        drop(store.upsert(&dryer("a"), reading(18.0), None, now()).await);

        let mut handle = store.lock(&dryer("a")).await.unwrap();
        handle.actuator.is_pouring = true;
        handle.actuator.shaker_on = false;

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let (handle, created) = store
                    .upsert(&dryer("a"), reading(16.0), None, now())
                    .await;
                (handle.clone(), created)
            })
        };
        tokio::task::yield_now().await;

        store.remove(&mut handle);
        drop(handle);

        let (record, created) = waiter.await.unwrap();
        assert!(created);
        assert!(!record.actuator.is_pouring);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn should_restore_record_when_device_unknown() {
        let store = TelemetryStore::new();
        let mut record = DeviceRecord::new(dryer("a"));
        record.actuator = ActuatorState {
            roof_open: false,
            shaker_on: false,
            is_pouring: true,
        };

        assert!(store.restore(record.clone()));
        assert!(!store.restore(record));

        let restored = store.get(&dryer("a")).await.unwrap();
        assert!(restored.actuator.is_pouring);
    }

    #[test]
    fn should_rebuild_record_offline_when_restored_from_snapshot() {
        let at = now();
        let mut telemetry = DeviceTelemetry::new(dryer("a"));
        telemetry.record(reading(15.0), None, at);
        let snapshot = DeviceSnapshot::new(
            &telemetry,
            ActuatorState::default(),
            TargetMoisture::default(),
        );

        let record = DeviceRecord::from_snapshot(&snapshot);

        assert_eq!(record.telemetry.last_update_at(), Some(at));
        assert!(!record.telemetry.is_online());
        assert_eq!(record.snapshot(TargetMoisture::default()), snapshot);
    }
}
