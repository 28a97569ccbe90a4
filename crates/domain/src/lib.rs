//! # harvestguard-domain
//!
//! Pure domain model for the harvestguard grain-drying controller.
//!
//! ## Responsibilities
//! - Foundational types: identifiers, error conventions, timestamps
//! - Define **telemetry** (the latest sensor reading of a dryer)
//! - Define **actuator state** (roof, shaker, pour) and its interlocks
//! - Provide the **decision engine**, a pure transition function from
//!   telemetry + current actuator state to the next actuator state
//! - Provide **liveness** classification (online/offline from update recency)
//! - Define the **snapshot** exposed to persistence, UI and outbound commands
//! - Define **events** (records of what happened to a device)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod actuator;
pub mod decision;
pub mod event;
pub mod liveness;
pub mod snapshot;
pub mod telemetry;
