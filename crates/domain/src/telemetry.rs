//! Telemetry — the latest sensor reading reported by a dryer.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::DeviceId;
use crate::liveness::Liveness;
use crate::time::Timestamp;

/// One sensor sample as reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryReading {
    /// Grain temperature in °C.
    pub temperature: f64,
    /// Estimated moisture content in percent.
    pub humidity: f64,
    pub is_rain_detected: bool,
    #[serde(default)]
    pub is_sunny: bool,
}

impl TelemetryReading {
    /// Check that every numeric field is a finite number.
    ///
    /// No range checks are applied: a dryer reporting 80 °C is unusual
    /// but not malformed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonFinite`] naming the offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.temperature.is_finite() {
            return Err(ValidationError::NonFinite {
                field: "temperature",
            });
        }
        if !self.humidity.is_finite() {
            return Err(ValidationError::NonFinite { field: "humidity" });
        }
        Ok(())
    }

    #[must_use]
    pub fn heat_status(&self) -> HeatStatus {
        HeatStatus::from_temperature(self.temperature)
    }
}

/// Latest known telemetry of one device.
///
/// The online flag can only be written through [`apply_liveness`](Self::apply_liveness),
/// which takes a [`Liveness`] produced by the watchdog classification.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTelemetry {
    device_id: DeviceId,
    reading: TelemetryReading,
    reported_at: Option<Timestamp>,
    last_update_at: Option<Timestamp>,
    is_online: bool,
}

impl DeviceTelemetry {
    /// A device that has never reported: zeroed reading, offline.
    #[must_use]
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            device_id,
            reading: TelemetryReading::default(),
            reported_at: None,
            last_update_at: None,
            is_online: false,
        }
    }

    /// Store a new reading ingested at `at`.
    ///
    /// `reported_at` is the device-side timestamp, kept for reference only.
    /// The online flag is left untouched.
    pub fn record(
        &mut self,
        reading: TelemetryReading,
        reported_at: Option<Timestamp>,
        at: Timestamp,
    ) {
        self.reading = reading;
        self.reported_at = reported_at;
        self.last_update_at = Some(at);
    }

    /// Write the online flag from a watchdog classification.
    ///
    /// Returns `true` when the flag changed.
    pub fn apply_liveness(&mut self, liveness: Liveness) -> bool {
        let changed = self.is_online != liveness.is_online();
        self.is_online = liveness.is_online();
        changed
    }

    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    #[must_use]
    pub fn reading(&self) -> &TelemetryReading {
        &self.reading
    }

    #[must_use]
    pub fn reported_at(&self) -> Option<Timestamp> {
        self.reported_at
    }

    /// Ingestion time of the latest reading, `None` if never reported.
    #[must_use]
    pub fn last_update_at(&self) -> Option<Timestamp> {
        self.last_update_at
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.is_online
    }
}

/// Coarse classification of grain temperature shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatStatus {
    Optimal,
    HighHeat,
    Overheating,
}

impl HeatStatus {
    pub const HIGH_HEAT_ABOVE: f64 = 40.0;
    pub const OVERHEATING_ABOVE: f64 = 45.0;

    #[must_use]
    pub fn from_temperature(temperature: f64) -> Self {
        if temperature > Self::OVERHEATING_ABOVE {
            Self::Overheating
        } else if temperature > Self::HIGH_HEAT_ABOVE {
            Self::HighHeat
        } else {
            Self::Optimal
        }
    }
}

impl std::fmt::Display for HeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimal => f.write_str("optimal"),
            Self::HighHeat => f.write_str("high_heat"),
            Self::Overheating => f.write_str("overheating"),
        }
    }
}
