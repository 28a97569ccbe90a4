//! Liveness watchdog — time-driven online/offline classification.
//!
//! The watchdog is pull-based: it never waits for devices, it compares the
//! ingestion time of their latest reading with `now`. The sweep itself is
//! driven by the device service, which persists each flip before it becomes
//! visible. Sweeping twice with the same `now` is a no-op the second time.

use harvestguard_domain::id::DeviceId;
use harvestguard_domain::liveness::Liveness;
use harvestguard_domain::telemetry::DeviceTelemetry;
use harvestguard_domain::time::{Span, Timestamp};

/// A device whose online flag flipped during a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessChange {
    pub device_id: DeviceId,
    pub online: bool,
    /// Time since the last reading, `None` when the device never reported.
    pub elapsed: Option<Span>,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub online: usize,
    pub offline: usize,
    /// Flips that were persisted and announced.
    pub changes: Vec<LivenessChange>,
    /// Flips left unapplied because their snapshot could not be persisted.
    pub failed: usize,
}

/// Classifies devices against a silence timeout.
#[derive(Debug, Clone, Copy)]
pub struct LivenessWatchdog {
    timeout: Span,
}

impl LivenessWatchdog {
    #[must_use]
    pub fn new(timeout: Span) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Span {
        self.timeout
    }

    #[must_use]
    pub fn classify(&self, telemetry: &DeviceTelemetry, now: Timestamp) -> Liveness {
        Liveness::classify(telemetry.last_update_at(), now, self.timeout)
    }
}
