//! # harvestguardd — harvestguard daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the device service and restore persisted devices
//! - Start the control loop (liveness sweep and decision cycle)
//! - Start the enabled integrations
//! - Build the axum router and serve it
//! - Handle graceful shutdown (SIGINT), then stop background tasks
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use harvestguard_adapter_http_axum::router;
use harvestguard_adapter_http_axum::state::AppState;
use harvestguard_adapter_storage_sqlite_sqlx::Database;
use harvestguard_adapter_virtual::VirtualIntegration;
use harvestguard_app::clock::SystemClock;
use harvestguard_app::control_loop::ControlLoop;
use harvestguard_app::event_bus::InProcessEventBus;
use harvestguard_app::ports::Integration;
use harvestguard_app::scheduler::Shutdown;
use harvestguard_app::services::device_service::DeviceService;
use harvestguard_app::services::integration_context::ServiceContext;
use harvestguard_app::watchdog::LivenessWatchdog;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database
    let db = Database::connect(config.database_url(), config.database.max_connections).await?;

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(256));

    // Services
    let device_service = Arc::new(DeviceService::new(
        db.snapshots(),
        Arc::clone(&event_bus),
        SystemClock,
        config.control.target()?,
    ));
    device_service.restore().await?;

    // Control loop
    let shutdown = Shutdown::new();
    let control = Arc::new(ControlLoop::new(
        Arc::clone(&device_service),
        LivenessWatchdog::new(config.control.watchdog_timeout()),
    ));
    let tasks = control.spawn(config.control.cadence(), &shutdown);

    // Integrations
    let mut virtual_integration = if config.integrations.virtual_enabled {
        let mut integration = VirtualIntegration::new(
            config.integrations.virtual_devices,
            config.integrations.virtual_interval(),
        )?;
        let ctx = ServiceContext::new(Arc::clone(&device_service));
        integration.setup(&ctx).await?;
        integration.start_background(ctx, shutdown.subscribe()).await?;
        tracing::info!(name = integration.name(), "integration started");
        Some(integration)
    } else {
        None
    };

    // HTTP
    let state = AppState::new(device_service, event_bus);
    let app = router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "harvestguardd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.trigger();
    if let Some(integration) = virtual_integration.as_mut() {
        integration.teardown().await?;
    }
    for task in tasks {
        task.await?;
    }
    db.close().await;
    tracing::info!("harvestguardd stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
