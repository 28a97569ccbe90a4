//! Concrete [`IntegrationContext`] backed by the device service.

use std::sync::Arc;

use harvestguard_domain::error::HarvestGuardError;
use harvestguard_domain::id::DeviceId;
use harvestguard_domain::snapshot::DeviceSnapshot;

use crate::ports::{Clock, EventPublisher, IntegrationContext, SnapshotRepository};
use crate::services::device_service::{DeviceService, IngestTelemetry};

/// [`IntegrationContext`] implementation that delegates to `DeviceService`.
///
/// Wraps an `Arc`-ed service so it is cheaply cloneable and `Send + Sync`.
/// The generic parameters are confined to this struct — integrations see
/// only the [`IntegrationContext`] trait.
pub struct ServiceContext<R, P, C> {
    device_service: Arc<DeviceService<R, P, C>>,
}

impl<R, P, C> ServiceContext<R, P, C> {
    pub fn new(device_service: Arc<DeviceService<R, P, C>>) -> Self {
        Self { device_service }
    }
}

impl<R, P, C> Clone for ServiceContext<R, P, C> {
    fn clone(&self) -> Self {
        Self {
            device_service: Arc::clone(&self.device_service),
        }
    }
}

impl<R, P, C> IntegrationContext for ServiceContext<R, P, C>
where
    R: SnapshotRepository + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
    C: Clock + 'static,
{
    async fn ingest(&self, command: IngestTelemetry) -> Result<DeviceSnapshot, HarvestGuardError> {
        self.device_service.ingest(command).await
    }

    async fn snapshot(&self, device_id: &DeviceId) -> Result<DeviceSnapshot, HarvestGuardError> {
        self.device_service.get_snapshot(device_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::device_service::tests::{dryer, harness, ingest};

    #[tokio::test]
    async fn should_ingest_through_device_service() {
        let h = harness();
        let ctx = ServiceContext::new(Arc::clone(&h.service));

        ctx.ingest(ingest("virtual-1", 18.0, false)).await.unwrap();

        let snapshot = ctx.snapshot(&dryer("virtual-1")).await.unwrap();
        assert!((snapshot.humidity - 18.0).abs() < f64::EPSILON);
        assert_eq!(h.service.store().len(), 1);
    }

    #[tokio::test]
    async fn should_return_unknown_device_when_snapshot_missing() {
        let h = harness();
        let ctx = ServiceContext::new(Arc::clone(&h.service));

        let result = ctx.snapshot(&dryer("virtual-9")).await;

        assert!(matches!(result, Err(HarvestGuardError::UnknownDevice(_))));
    }
}
