//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
pub mod sse;
#[allow(clippy::missing_errors_doc)]
pub mod telemetry;

use axum::Router;
use axum::routing::{get, post, put};

use harvestguard_app::ports::{Clock, SnapshotRepository};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<R, C>() -> Router<AppState<R, C>>
where
    R: SnapshotRepository + Send + Sync + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/telemetry", post(telemetry::ingest::<R, C>))
        .route("/devices", get(devices::list::<R, C>))
        .route(
            "/devices/{id}",
            get(devices::get::<R, C>).delete(devices::delete::<R, C>),
        )
        .route("/devices/{id}/shaker", put(devices::toggle_shaker::<R, C>))
        .route("/devices/{id}/stop-pour", post(devices::stop_pour::<R, C>))
        .route("/events/stream", get(sse::stream::<R, C>))
}
