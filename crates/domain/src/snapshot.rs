//! Snapshot — the merged telemetry + actuator view of one device.
//!
//! This is what persistence, dashboards and outbound actuator commands
//! consume. Every derived field is computed from the state; nothing here
//! feeds back into decisions.

use serde::{Deserialize, Serialize};

use crate::actuator::{ActuatorState, DryingPhase, TargetMoisture};
use crate::id::DeviceId;
use crate::telemetry::{DeviceTelemetry, HeatStatus};
use crate::time::Timestamp;

/// Progress of the storage transfer shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageStatus {
    InProgress,
    ReadyToPour,
    Transferring,
}

impl StorageStatus {
    #[must_use]
    pub fn derive(ready: bool, is_pouring: bool) -> Self {
        if is_pouring {
            Self::Transferring
        } else if ready {
            Self::ReadyToPour
        } else {
            Self::InProgress
        }
    }
}

/// Authoritative externally visible state of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub device_id: DeviceId,
    pub is_online: bool,
    pub roof_open: bool,
    pub shaker_on: bool,
    pub is_pouring: bool,
    pub temperature: f64,
    pub humidity: f64,
    pub is_rain_detected: bool,
    pub is_sunny: bool,
    pub target_moisture: TargetMoisture,
    pub phase: DryingPhase,
    pub heat_status: HeatStatus,
    pub storage_status: StorageStatus,
    pub last_update_at: Option<Timestamp>,
}

impl DeviceSnapshot {
    #[must_use]
    pub fn new(
        telemetry: &DeviceTelemetry,
        actuator: ActuatorState,
        target: TargetMoisture,
    ) -> Self {
        let reading = telemetry.reading();
        Self {
            device_id: telemetry.device_id().clone(),
            is_online: telemetry.is_online(),
            roof_open: actuator.roof_open,
            shaker_on: actuator.shaker_on,
            is_pouring: actuator.is_pouring,
            temperature: reading.temperature,
            humidity: reading.humidity,
            is_rain_detected: reading.is_rain_detected,
            is_sunny: reading.is_sunny,
            target_moisture: target,
            phase: actuator.phase(),
            heat_status: reading.heat_status(),
            storage_status: StorageStatus::derive(
                target.is_reached_by(reading.humidity),
                actuator.is_pouring,
            ),
            last_update_at: telemetry.last_update_at(),
        }
    }

    /// The actuator part of the snapshot.
    #[must_use]
    pub fn actuator(&self) -> ActuatorState {
        ActuatorState {
            roof_open: self.roof_open,
            shaker_on: self.shaker_on,
            is_pouring: self.is_pouring,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryReading;

    fn telemetry(humidity: f64) -> DeviceTelemetry {
        let mut t = DeviceTelemetry::new(DeviceId::new("dryer-01").unwrap());
        t.record(
            TelemetryReading {
                temperature: 41.5,
                humidity,
                is_rain_detected: false,
                is_sunny: true,
            },
            None,
            crate::time::now(),
        );
        t
    }

    #[test]
    fn should_merge_telemetry_and_actuator_fields() {
        let t = telemetry(16.0);
        let snapshot = DeviceSnapshot::new(&t, ActuatorState::default(), TargetMoisture::default());
        assert_eq!(snapshot.device_id.as_str(), "dryer-01");
        assert!(!snapshot.is_online);
        assert!(snapshot.roof_open);
        assert!(snapshot.shaker_on);
        assert!(!snapshot.is_pouring);
        assert_eq!(snapshot.phase, DryingPhase::Drying);
        assert_eq!(snapshot.heat_status, HeatStatus::HighHeat);
        assert_eq!(snapshot.storage_status, StorageStatus::InProgress);
        assert_eq!(snapshot.last_update_at, t.last_update_at());
    }

    #[test]
    fn should_report_ready_to_pour_before_pour_starts() {
        let snapshot = DeviceSnapshot::new(
            &telemetry(13.0),
            ActuatorState::default(),
            TargetMoisture::default(),
        );
        assert_eq!(snapshot.storage_status, StorageStatus::ReadyToPour);
    }

    #[test]
    fn should_report_transferring_while_pouring() {
        assert_eq!(StorageStatus::derive(false, true), StorageStatus::Transferring);
        assert_eq!(StorageStatus::derive(true, true), StorageStatus::Transferring);
    }

    #[test]
    fn should_extract_actuator_state() {
        let actuator = ActuatorState {
            roof_open: false,
            shaker_on: false,
            is_pouring: true,
        };
        let snapshot = DeviceSnapshot::new(&telemetry(13.0), actuator, TargetMoisture::default());
        assert_eq!(snapshot.actuator(), actuator);
    }

    #[test]
    fn should_serialize_with_snake_case_fields() {
        let snapshot = DeviceSnapshot::new(
            &telemetry(16.0),
            ActuatorState::default(),
            TargetMoisture::default(),
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["device_id"], "dryer-01");
        assert_eq!(json["is_pouring"], false);
        assert_eq!(json["storage_status"], "in_progress");
        assert_eq!(json["target_moisture"], 14.0);
    }
}
