//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`HarvestGuardError`] via `#[from]`.

use crate::id::DeviceId;

/// Top-level error returned by domain and application operations.
#[derive(Debug, thiserror::Error)]
pub enum HarvestGuardError {
    /// Input rejected at the boundary.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The operation referenced a device that never reported telemetry.
    #[error("unknown device")]
    UnknownDevice(#[from] UnknownDeviceError),

    /// Failure in a persistence adapter.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Reasons an input value is malformed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Device identifiers must contain at least one non-blank character.
    #[error("device id must not be empty")]
    EmptyDeviceId,

    /// Device identifiers are bounded in length.
    #[error("device id exceeds {max} characters")]
    DeviceIdTooLong { max: usize },

    /// Sensor values must be finite numbers.
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    /// Target moisture must be a percentage.
    #[error("target moisture {value} is outside 0..=100")]
    TargetMoistureOutOfRange { value: f64 },
}

/// Raised when a device id has no record in the telemetry store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("device {device_id} has no telemetry")]
pub struct UnknownDeviceError {
    pub device_id: DeviceId,
}

impl From<DeviceId> for UnknownDeviceError {
    fn from(device_id: DeviceId) -> Self {
        Self { device_id }
    }
}
