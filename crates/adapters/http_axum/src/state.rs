//! Shared application state for axum handlers.

use std::sync::Arc;

use harvestguard_app::event_bus::InProcessEventBus;
use harvestguard_app::ports::{Clock, SnapshotRepository};
use harvestguard_app::services::device_service::DeviceService;

/// Device service as wired behind the HTTP layer: events go to the
/// in-process bus so the SSE endpoint can relay them.
pub type HttpDeviceService<R, C> = DeviceService<R, Arc<InProcessEventBus>, C>;

/// Application state shared across all axum handlers.
///
/// Generic over the snapshot repository and the clock to avoid dynamic
/// dispatch. `Clone` is implemented manually so the underlying types
/// themselves do not need to be `Clone` — only the `Arc` wrappers are cloned.
pub struct AppState<R, C> {
    /// Telemetry, command and snapshot use-cases.
    pub device_service: Arc<HttpDeviceService<R, C>>,
    /// In-process event bus for SSE subscriptions.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<R, C> Clone for AppState<R, C> {
    fn clone(&self) -> Self {
        Self {
            device_service: Arc::clone(&self.device_service),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<R, C> AppState<R, C>
where
    R: SnapshotRepository + Send + Sync + 'static,
    C: Clock + 'static,
{
    /// Create the state from a service shared with background tasks.
    pub fn new(
        device_service: Arc<HttpDeviceService<R, C>>,
        event_bus: Arc<InProcessEventBus>,
    ) -> Self {
        Self {
            device_service,
            event_bus,
        }
    }
}
