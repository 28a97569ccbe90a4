//! Control loop — drives the watchdog and the decision engine on cadences.
//!
//! Each cycle walks every known device once. A device that fails (removed
//! between listing and evaluation, sink error) is logged and counted, and
//! the cycle moves on to the next device.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::ports::{Clock, EventPublisher, SnapshotRepository};
use crate::scheduler::{Shutdown, spawn_periodic};
use crate::services::device_service::DeviceService;
use crate::watchdog::LivenessWatchdog;

/// Cadences of the two periodic tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub watchdog: Duration,
    pub decision: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            watchdog: Duration::from_secs(30),
            decision: Duration::from_secs(5),
        }
    }
}

/// Outcome of one pass over the devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub applied: usize,
    pub failed: usize,
}

/// Runs decision cycles and liveness sweeps for a [`DeviceService`].
pub struct ControlLoop<R, P, C> {
    service: Arc<DeviceService<R, P, C>>,
    watchdog: LivenessWatchdog,
}

impl<R, P, C> ControlLoop<R, P, C>
where
    R: SnapshotRepository + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
    C: Clock + 'static,
{
    pub fn new(service: Arc<DeviceService<R, P, C>>, watchdog: LivenessWatchdog) -> Self {
        Self { service, watchdog }
    }

    /// Evaluate the decision engine once for every device.
    pub async fn run_decision_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        for device_id in self.service.store().device_ids() {
            match self.service.run_decision(&device_id).await {
                Ok(_) => report.applied += 1,
                Err(err) => {
                    tracing::warn!(%device_id, error = %err, "decision cycle failed for device");
                    report.failed += 1;
                }
            }
        }
        tracing::debug!(applied = report.applied, failed = report.failed, "decision cycle done");
        report
    }

    /// Sweep liveness once.
    ///
    /// `applied` counts the flips persisted and announced, `failed` those
    /// left for the next sweep.
    pub async fn run_watchdog_sweep(&self) -> CycleReport {
        let sweep = self.service.sweep_liveness(&self.watchdog).await;
        let report = CycleReport {
            applied: sweep.changes.len(),
            failed: sweep.failed,
        };
        tracing::debug!(
            online = sweep.online,
            offline = sweep.offline,
            changed = report.applied,
            failed = report.failed,
            "watchdog sweep done"
        );
        report
    }

    /// Spawn the watchdog and decision tasks. They stop when `shutdown` fires.
    pub fn spawn(self: Arc<Self>, cadence: Cadence, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
        let watchdog = {
            let control = Arc::clone(&self);
            spawn_periodic("watchdog", cadence.watchdog, shutdown.subscribe(), move || {
                let control = Arc::clone(&control);
                async move {
                    control.run_watchdog_sweep().await;
                }
            })
        };
        let decision = spawn_periodic("decision", cadence.decision, shutdown.subscribe(), move || {
            let control = Arc::clone(&self);
            async move {
                control.run_decision_cycle().await;
            }
        });
        vec![watchdog, decision]
    }
}
