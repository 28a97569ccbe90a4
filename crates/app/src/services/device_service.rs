//! Device service — use-cases for ingesting telemetry and commanding dryers.
//!
//! Every mutation locks the device and builds the new record on a copy. The
//! copy replaces the stored record only once the repository accepted its
//! snapshot, and events are published after that. A sink failure therefore
//! leaves the device exactly as it was, and the next attempt sees the same
//! transition again. Two operations on the same device never interleave.

use serde_json::json;

use harvestguard_domain::actuator::{ActuatorState, TargetMoisture};
use harvestguard_domain::decision::{self, Decision, ShakerOutcome};
use harvestguard_domain::error::{HarvestGuardError, UnknownDeviceError};
use harvestguard_domain::event::{Event, EventType};
use harvestguard_domain::id::DeviceId;
use harvestguard_domain::liveness::Liveness;
use harvestguard_domain::snapshot::DeviceSnapshot;
use harvestguard_domain::telemetry::TelemetryReading;
use harvestguard_domain::time::Timestamp;

use crate::ports::{Clock, EventPublisher, SnapshotRepository};
use crate::telemetry_store::{DeviceHandle, DeviceRecord, TelemetryStore};
use crate::watchdog::{LivenessChange, LivenessWatchdog, SweepReport};

/// A reading pushed by a device.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestTelemetry {
    pub device_id: DeviceId,
    pub reading: TelemetryReading,
    /// Device-side timestamp, informational only.
    pub reported_at: Option<Timestamp>,
}

/// Result of an operator shaker toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct ShakerToggle {
    pub snapshot: DeviceSnapshot,
    pub outcome: ShakerOutcome,
}

impl ShakerToggle {
    #[must_use]
    pub fn accepted(&self) -> bool {
        !matches!(self.outcome, ShakerOutcome::Rejected(_))
    }
}

/// Application service owning the telemetry store and its side effects.
pub struct DeviceService<R, P, C> {
    store: TelemetryStore,
    repo: R,
    publisher: P,
    clock: C,
    target: TargetMoisture,
}

impl<R, P, C> DeviceService<R, P, C>
where
    R: SnapshotRepository + Send + Sync,
    P: EventPublisher + Send + Sync,
    C: Clock,
{
    /// Create a service over an empty store.
    pub fn new(repo: R, publisher: P, clock: C, target: TargetMoisture) -> Self {
        Self {
            store: TelemetryStore::new(),
            repo,
            publisher,
            clock,
            target,
        }
    }

    #[must_use]
    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    #[must_use]
    pub fn target(&self) -> TargetMoisture {
        self.target
    }

    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn event(
        &self,
        event_type: EventType,
        device_id: &DeviceId,
        data: serde_json::Value,
    ) -> Event {
        Event::at(event_type, Some(device_id.clone()), data, self.clock.now())
    }

    async fn lock(&self, device_id: &DeviceId) -> Result<DeviceHandle, HarvestGuardError> {
        self.store
            .lock(device_id)
            .await
            .ok_or_else(|| UnknownDeviceError::from(device_id.clone()).into())
    }

    /// Persist `candidate`, then make it the current record of `handle`.
    ///
    /// On error the handle keeps its previous record.
    async fn commit(
        &self,
        handle: &mut DeviceHandle,
        candidate: DeviceRecord,
    ) -> Result<DeviceSnapshot, HarvestGuardError> {
        let snapshot = self
            .repo
            .save(candidate.snapshot(self.target), self.clock.now())
            .await?;
        **handle = candidate;
        Ok(snapshot)
    }

    async fn publish_all(&self, events: Vec<Event>) -> Result<(), HarvestGuardError> {
        for event in events {
            self.publisher.publish(event).await?;
        }
        Ok(())
    }

    fn actuator_changed(
        &self,
        device_id: &DeviceId,
        from: ActuatorState,
        to: ActuatorState,
    ) -> Event {
        self.event(
            EventType::ActuatorChanged,
            device_id,
            json!({ "from": from, "to": to, "phase": to.phase() }),
        )
    }

    fn decision_events(
        &self,
        device_id: &DeviceId,
        previous: ActuatorState,
        decision: &Decision,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        if decision.next != previous {
            events.push(self.actuator_changed(device_id, previous, decision.next));
        }
        if decision.pour_started {
            events.push(self.event(EventType::PourStarted, device_id, json!({})));
        }
        events
    }

    /// Ingest a reading: validate, store, persist, publish.
    ///
    /// The roof follows the rain sensor of the new reading right away. The
    /// shaker, the pour and the online flag are left alone; the decision
    /// cycle and the watchdog pick the reading up on their next run.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestGuardError::Validation`] for non-finite values, or a
    /// storage error from the repository. A device seen for the first time
    /// is not registered when its snapshot cannot be persisted.
    #[tracing::instrument(skip(self, command), fields(device_id = %command.device_id))]
    pub async fn ingest(
        &self,
        command: IngestTelemetry,
    ) -> Result<DeviceSnapshot, HarvestGuardError> {
        command.reading.validate()?;
        let at = self.clock.now();
        let (mut handle, created) = self.store.entry(&command.device_id).await;
        let previous = handle.actuator;

        let mut candidate = DeviceRecord::clone(&handle);
        candidate
            .telemetry
            .record(command.reading, command.reported_at, at);
        candidate.actuator = decision::follow_weather(previous, &command.reading);
        let next = candidate.actuator;

        let snapshot = match self.commit(&mut handle, candidate).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                if created {
                    self.store.remove(&mut handle);
                }
                return Err(err);
            }
        };

        let mut events = Vec::with_capacity(3);
        if created {
            tracing::info!("device registered");
            events.push(self.event(EventType::DeviceRegistered, &command.device_id, json!({})));
        }
        events.push(self.event(
            EventType::TelemetryReceived,
            &command.device_id,
            json!(command.reading),
        ));
        if next != previous {
            tracing::info!(roof_open = next.roof_open, "roof follows weather");
            events.push(self.actuator_changed(&command.device_id, previous, next));
        }
        self.publish_all(events).await?;
        drop(handle);
        Ok(snapshot)
    }

    /// Current snapshot of one device.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestGuardError::UnknownDevice`] when the device never reported.
    pub async fn get_snapshot(
        &self,
        device_id: &DeviceId,
    ) -> Result<DeviceSnapshot, HarvestGuardError> {
        let handle = self.lock(device_id).await?;
        Ok(handle.snapshot(self.target))
    }

    /// Snapshots of every known device, ordered by id.
    pub async fn list_snapshots(&self) -> Vec<DeviceSnapshot> {
        let mut snapshots: Vec<DeviceSnapshot> = self
            .store
            .list_all()
            .await
            .iter()
            .map(|record| record.snapshot(self.target))
            .collect();
        snapshots.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        snapshots
    }

    /// Operator request to turn the shaker on or off.
    ///
    /// A request made while the grain is ready or pouring is rejected and
    /// leaves the device untouched. That is a normal outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestGuardError::UnknownDevice`] when the device never
    /// reported, or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_shaker(
        &self,
        device_id: &DeviceId,
        desired_on: bool,
    ) -> Result<ShakerToggle, HarvestGuardError> {
        let mut handle = self.lock(device_id).await?;
        let previous = handle.actuator;
        let decision = decision::decide(
            handle.telemetry.reading(),
            previous,
            self.target,
            Some(desired_on),
        );

        if let ShakerOutcome::Rejected(reason) = decision.shaker {
            tracing::info!(%reason, "shaker request rejected");
            let event = self.event(
                EventType::ShakerRejected,
                device_id,
                json!({ "desired_on": desired_on, "reason": reason }),
            );
            self.publisher.publish(event).await?;
            return Ok(ShakerToggle {
                snapshot: handle.snapshot(self.target),
                outcome: decision.shaker,
            });
        }

        let mut candidate = DeviceRecord::clone(&handle);
        candidate.actuator = decision.next;
        let snapshot = self.commit(&mut handle, candidate).await?;

        let mut events = vec![self.event(
            EventType::ShakerToggled,
            device_id,
            json!({ "from": previous.shaker_on, "to": decision.next.shaker_on }),
        )];
        events.extend(self.decision_events(device_id, previous, &decision));
        self.publish_all(events).await?;

        Ok(ShakerToggle {
            snapshot,
            outcome: decision.shaker,
        })
    }

    /// Operator stop: end any pour and return to drying.
    ///
    /// Applied whatever the current phase. If the grain is still ready the
    /// next decision cycle starts a new pour.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestGuardError::UnknownDevice`] when the device never
    /// reported, or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn stop_pour(
        &self,
        device_id: &DeviceId,
    ) -> Result<DeviceSnapshot, HarvestGuardError> {
        let mut handle = self.lock(device_id).await?;
        let previous = handle.actuator;
        let mut candidate = DeviceRecord::clone(&handle);
        candidate.actuator = decision::stop_pour(previous);
        let snapshot = self.commit(&mut handle, candidate).await?;

        tracing::info!(was_pouring = previous.is_pouring, "pour stopped");
        let event = self.event(
            EventType::PourStopped,
            device_id,
            json!({ "was_pouring": previous.is_pouring }),
        );
        self.publisher.publish(event).await?;
        Ok(snapshot)
    }

    /// Forget a device and delete its persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestGuardError::UnknownDevice`] when the device is not
    /// known, or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn deregister(&self, device_id: &DeviceId) -> Result<(), HarvestGuardError> {
        let mut handle = self.lock(device_id).await?;
        self.repo.delete(device_id).await?;
        self.store.remove(&mut handle);

        tracing::info!("device deregistered");
        let event = self.event(EventType::DeviceDeregistered, device_id, json!({}));
        self.publisher.publish(event).await?;
        drop(handle);
        Ok(())
    }

    /// Run one decision cycle for one device and apply its result.
    ///
    /// The snapshot is persisted only when the actuators changed. When that
    /// fails nothing is applied, so the next cycle makes the same decision
    /// and announces it then.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestGuardError::UnknownDevice`] when the device was
    /// removed, or a storage error from the repository.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn run_decision(&self, device_id: &DeviceId) -> Result<Decision, HarvestGuardError> {
        let mut handle = self.lock(device_id).await?;
        let previous = handle.actuator;
        let decision = decision::decide(handle.telemetry.reading(), previous, self.target, None);

        if decision.next != previous {
            let mut candidate = DeviceRecord::clone(&handle);
            candidate.actuator = decision.next;
            self.commit(&mut handle, candidate).await?;
        }
        if decision.pour_started {
            tracing::info!(humidity = handle.telemetry.reading().humidity, "pour started");
        }
        self.publish_all(self.decision_events(device_id, previous, &decision))
            .await?;
        Ok(decision)
    }

    /// Classify every device with `watchdog` at the current clock time.
    ///
    /// A device whose flag flips is persisted and announced with
    /// `DeviceOnline` or `DeviceOffline`. A flip that cannot be persisted is
    /// counted as failed and left unapplied, so the next sweep retries it.
    #[tracing::instrument(skip(self, watchdog))]
    pub async fn sweep_liveness(&self, watchdog: &LivenessWatchdog) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();
        for device_id in self.store.device_ids() {
            let Some(mut handle) = self.store.lock(&device_id).await else {
                continue;
            };
            let liveness = watchdog.classify(&handle.telemetry, now);
            if liveness.is_online() {
                report.online += 1;
            } else {
                report.offline += 1;
            }

            let mut candidate = DeviceRecord::clone(&handle);
            if !candidate.telemetry.apply_liveness(liveness) {
                continue;
            }
            match self.record_liveness(&mut handle, candidate, liveness).await {
                Ok(()) => report.changes.push(LivenessChange {
                    device_id,
                    online: liveness.is_online(),
                    elapsed: liveness.elapsed(),
                }),
                Err(err) => {
                    tracing::warn!(%device_id, error = %err, "failed to record liveness change");
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn record_liveness(
        &self,
        handle: &mut DeviceHandle,
        candidate: DeviceRecord,
        liveness: Liveness,
    ) -> Result<(), HarvestGuardError> {
        self.commit(handle, candidate).await?;
        let event_type = if liveness.is_online() {
            EventType::DeviceOnline
        } else {
            EventType::DeviceOffline
        };
        let device_id = handle.device_id();
        tracing::info!(%device_id, online = liveness.is_online(), "liveness changed");
        let elapsed_secs = liveness.elapsed().map(|elapsed| elapsed.num_seconds());
        let event = self.event(
            event_type,
            device_id,
            json!({ "elapsed_secs": elapsed_secs }),
        );
        self.publisher.publish(event).await
    }

    /// Load persisted snapshots into the store.
    ///
    /// Devices already known to the store are left alone. Returns how many
    /// records were restored.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self) -> Result<usize, HarvestGuardError> {
        let snapshots = self.repo.get_all().await?;
        let restored = snapshots
            .iter()
            .filter(|snapshot| self.store.restore(DeviceRecord::from_snapshot(snapshot)))
            .count();
        tracing::info!(restored, "devices restored");
        Ok(restored)
    }
}
