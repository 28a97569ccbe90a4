//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use harvestguard_app::ports::{Clock, SnapshotRepository};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api` and exposes `/health`. Includes a
/// [`TraceLayer`] that logs each HTTP request/response at the `DEBUG` level
/// using the `tracing` ecosystem.
pub fn build<R, C>(state: AppState<R, C>) -> Router
where
    R: SnapshotRepository + Send + Sync + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
