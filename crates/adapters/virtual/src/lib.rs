//! # harvestguard-adapter-virtual
//!
//! Virtual/demo integration that simulates grain dryers for testing and
//! demonstration purposes.
//!
//! ## Behaviour
//!
//! | Phase | What happens |
//! |-------|--------------|
//! | `setup` | every dryer reports a first reading, which registers it |
//! | background | every `interval`, each dryer reads its actuators, ticks and reports |
//! | `teardown` | waits for the background task once shutdown fired |
//!
//! A dryer that was deregistered is registered again by its next reading,
//! the same way a real unit would.
//!
//! ## Dependency rule
//!
//! Depends on `harvestguard-app` (port traits) and `harvestguard-domain` only.

mod dryer;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use harvestguard_app::ports::{Integration, IntegrationContext};
use harvestguard_app::scheduler::spawn_periodic;
use harvestguard_app::services::device_service::IngestTelemetry;
use harvestguard_domain::actuator::ActuatorState;
use harvestguard_domain::error::{HarvestGuardError, ValidationError};
use harvestguard_domain::id::DeviceId;

pub use dryer::VirtualDryer;

/// Virtual integration driving a fleet of simulated dryers.
pub struct VirtualIntegration {
    dryers: Arc<Mutex<Vec<VirtualDryer>>>,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl VirtualIntegration {
    /// Build `count` dryers named `virtual-dryer-01`, `virtual-dryer-02`, …
    ///
    /// # Errors
    ///
    /// Never fails for the generated names; the result mirrors
    /// [`DeviceId::new`].
    pub fn new(count: u32, interval: Duration) -> Result<Self, ValidationError> {
        let dryers = (1..=count)
            .map(|index| {
                DeviceId::new(format!("virtual-dryer-{index:02}"))
                    .map(|device_id| VirtualDryer::new(device_id, index - 1))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            dryers: Arc::new(Mutex::new(dryers)),
            interval,
            task: None,
        })
    }

    /// Identifiers of the simulated dryers.
    pub async fn device_ids(&self) -> Vec<DeviceId> {
        self.dryers
            .lock()
            .await
            .iter()
            .map(|dryer| dryer.device_id().clone())
            .collect()
    }
}

/// Advance every dryer one tick under its commanded actuator state.
///
/// Returns the number of readings ingested.
async fn tick(ctx: &impl IntegrationContext, dryers: &Mutex<Vec<VirtualDryer>>) -> usize {
    let mut ingested = 0;
    for dryer in dryers.lock().await.iter_mut() {
        let actuator = match ctx.snapshot(dryer.device_id()).await {
            Ok(snapshot) => snapshot.actuator(),
            Err(HarvestGuardError::UnknownDevice(_)) => ActuatorState::default(),
            Err(err) => {
                let device_id = dryer.device_id();
                tracing::warn!(%device_id, error = %err, "failed to read virtual dryer state");
                continue;
            }
        };
        let command = IngestTelemetry {
            device_id: dryer.device_id().clone(),
            reading: dryer.step(actuator),
            reported_at: None,
        };
        match ctx.ingest(command).await {
            Ok(_) => ingested += 1,
            Err(err) => {
                let device_id = dryer.device_id();
                tracing::warn!(%device_id, error = %err, "failed to ingest virtual reading");
            }
        }
    }
    ingested
}

impl Integration for VirtualIntegration {
    fn name(&self) -> &'static str {
        "virtual"
    }

    async fn setup(&mut self, ctx: &impl IntegrationContext) -> Result<(), HarvestGuardError> {
        let dryers = self.dryers.lock().await;
        for dryer in dryers.iter() {
            ctx.ingest(IngestTelemetry {
                device_id: dryer.device_id().clone(),
                reading: dryer.reading(),
                reported_at: None,
            })
            .await?;
        }
        tracing::info!(count = dryers.len(), "virtual dryers registered");
        Ok(())
    }

    async fn start_background(
        &mut self,
        ctx: impl IntegrationContext + Clone + 'static,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), HarvestGuardError> {
        let dryers = Arc::clone(&self.dryers);
        let handle = spawn_periodic("virtual-dryers", self.interval, shutdown, move || {
            let ctx = ctx.clone();
            let dryers = Arc::clone(&dryers);
            async move {
                let ingested = tick(&ctx, &dryers).await;
                tracing::trace!(ingested, "virtual tick");
            }
        });
        self.task = Some(handle);
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), HarvestGuardError> {
        if let Some(handle) = self.task.take()
            && let Err(err) = handle.await
        {
            tracing::warn!(error = %err, "virtual dryer task ended abnormally");
        }
        Ok(())
    }
}
