//! # harvestguard-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Accept **telemetry** pushed by dryers (`POST /api/telemetry`)
//! - Serve **device snapshots** (`/api/devices`, `/api/devices/{id}`)
//! - Accept **operator commands**: shaker toggle, stop pour, deregistration
//! - Stream **domain events** as Server-Sent Events for live dashboards
//! - Map application results and errors into HTTP responses
//!
//! ## Dependency rule
//! Depends on `harvestguard-app` (for port traits and services) and
//! `harvestguard-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
