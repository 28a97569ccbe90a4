//! Integration port — lifecycle of telemetry sources.
//!
//! An integration bridges an external source of readings (simulated dryers,
//! a field gateway, …) into harvestguard. It pushes readings through an
//! [`IntegrationContext`] and never touches the store directly.

use std::future::Future;

use tokio::sync::watch;

use harvestguard_domain::error::HarvestGuardError;
use harvestguard_domain::id::DeviceId;
use harvestguard_domain::snapshot::DeviceSnapshot;

use crate::services::device_service::IngestTelemetry;

/// What an integration may do with the engine.
///
/// This is a **port** — adapters call it to push readings and to read back
/// the actuator state they should simulate. The application provides a
/// concrete implementation backed by `DeviceService`.
pub trait IntegrationContext: Send + Sync {
    /// Ingest a reading, exactly as the HTTP endpoint would.
    fn ingest(
        &self,
        command: IngestTelemetry,
    ) -> impl Future<Output = Result<DeviceSnapshot, HarvestGuardError>> + Send;

    /// Current snapshot of a device.
    fn snapshot(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<DeviceSnapshot, HarvestGuardError>> + Send;
}

/// A pluggable telemetry source.
///
/// The binary crate calls the lifecycle methods in order:
///
/// 1. [`setup`](Self::setup) — announce devices with a first reading
/// 2. [`start_background`](Self::start_background) — spawn long-running tasks
/// 3. [`teardown`](Self::teardown) — wait for those tasks after shutdown fired
pub trait Integration {
    /// Unique name identifying this integration (e.g. `"virtual"`).
    fn name(&self) -> &'static str;

    /// Fast, non-blocking initialisation.
    fn setup(
        &mut self,
        ctx: &impl IntegrationContext,
    ) -> impl Future<Output = Result<(), HarvestGuardError>> + Send;

    /// Start long-running tasks that stop when `shutdown` fires.
    ///
    /// The default implementation is a no-op.
    fn start_background(
        &mut self,
        _ctx: impl IntegrationContext + Clone + 'static,
        _shutdown: watch::Receiver<bool>,
    ) -> impl Future<Output = Result<(), HarvestGuardError>> + Send {
        async { Ok(()) }
    }

    /// Called on graceful shutdown, after the shutdown signal fired.
    fn teardown(&mut self) -> impl Future<Output = Result<(), HarvestGuardError>> + Send;
}
