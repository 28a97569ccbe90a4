//! # harvestguard-app
//!
//! Application layer — use-cases, in-process infrastructure and **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `SnapshotRepository` — persist the merged device snapshot
//!   - `EventPublisher` — publish domain events
//!   - `Clock` — source of ingestion and sweep timestamps
//! - Own the **telemetry store**: latest reading and actuator state per
//!   device, one lock per device
//! - Provide the **liveness watchdog** sweep
//! - Provide **use-cases** (`DeviceService`): ingest, toggle shaker,
//!   stop pour, deregister, run a decision cycle
//! - Drive decisions and sweeps on fixed cadences (`ControlLoop`,
//!   `scheduler`)
//!
//! ## Dependency rule
//! Depends on `harvestguard-domain` only (plus `tokio` for locks, channels
//! and timers). Never imports adapter crates. Adapters depend on *this*
//! crate, not the reverse.

pub mod clock;
pub mod control_loop;
pub mod event_bus;
pub mod ports;
pub mod scheduler;
pub mod services;
pub mod telemetry_store;
pub mod watchdog;
