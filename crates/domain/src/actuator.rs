//! Actuator state — roof, shaker and storage pour of one dryer.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Commanded position of the three actuators of a dryer.
///
/// Interlock: `shaker_on && is_pouring` never holds. Every constructor
/// in this crate preserves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorState {
    pub roof_open: bool,
    pub shaker_on: bool,
    pub is_pouring: bool,
}

impl Default for ActuatorState {
    /// Roof open and shaker running: a freshly registered dryer is drying.
    fn default() -> Self {
        Self {
            roof_open: true,
            shaker_on: true,
            is_pouring: false,
        }
    }
}

impl ActuatorState {
    #[must_use]
    pub fn phase(self) -> DryingPhase {
        match (self.shaker_on, self.is_pouring) {
            (_, true) => DryingPhase::Pouring,
            (true, false) => DryingPhase::Drying,
            (false, false) => DryingPhase::Idle,
        }
    }

    /// Whether the shaker/pour interlock holds.
    #[must_use]
    pub fn interlock_holds(self) -> bool {
        !(self.shaker_on && self.is_pouring)
    }
}

/// Drying phase derived from `{shaker_on, is_pouring}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DryingPhase {
    /// Shaker running, grain being balanced under the open roof.
    Drying,
    /// Shaker stopped and not pouring: either switched off by an operator,
    /// or the instant before an automatic pour starts.
    Idle,
    /// Grain being transferred to storage.
    Pouring,
}

impl std::fmt::Display for DryingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drying => f.write_str("drying"),
            Self::Idle => f.write_str("idle"),
            Self::Pouring => f.write_str("pouring"),
        }
    }
}

/// Moisture content (percent) at or below which grain is ready for storage.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct TargetMoisture(f64);

impl TargetMoisture {
    /// Target used when a deployment does not configure one.
    pub const DEFAULT_PERCENT: f64 = 14.0;

    /// # Errors
    ///
    /// Returns [`ValidationError::TargetMoistureOutOfRange`] unless `percent`
    /// is finite and within `0..=100`.
    pub fn new(percent: f64) -> Result<Self, ValidationError> {
        if percent.is_finite() && (0.0..=100.0).contains(&percent) {
            Ok(Self(percent))
        } else {
            Err(ValidationError::TargetMoistureOutOfRange { value: percent })
        }
    }

    #[must_use]
    pub fn percent(self) -> f64 {
        self.0
    }

    /// Whether grain at `humidity` is ready. The comparison is inclusive.
    #[must_use]
    pub fn is_reached_by(self, humidity: f64) -> bool {
        humidity <= self.0
    }
}

impl Default for TargetMoisture {
    fn default() -> Self {
        Self(Self::DEFAULT_PERCENT)
    }
}

impl TryFrom<f64> for TargetMoisture {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TargetMoisture> for f64 {
    fn from(value: TargetMoisture) -> Self {
        value.0
    }
}
