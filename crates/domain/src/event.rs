//! Event — an immutable record of something that happened to a device.
//!
//! Events are produced when telemetry arrives, actuators change, operators
//! issue commands, and the watchdog flips a device online or offline.

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, EventId};
use crate::time::{Timestamp, now};

/// Kind of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DeviceRegistered,
    DeviceDeregistered,
    TelemetryReceived,
    ActuatorChanged,
    PourStarted,
    PourStopped,
    ShakerToggled,
    ShakerRejected,
    DeviceOnline,
    DeviceOffline,
}

impl EventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceRegistered => "device_registered",
            Self::DeviceDeregistered => "device_deregistered",
            Self::TelemetryReceived => "telemetry_received",
            Self::ActuatorChanged => "actuator_changed",
            Self::PourStarted => "pour_started",
            Self::PourStopped => "pour_stopped",
            Self::ShakerToggled => "shaker_toggled",
            Self::ShakerRejected => "shaker_rejected",
            Self::DeviceOnline => "device_online",
            Self::DeviceOffline => "device_offline",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened, with a free-form JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub device_id: Option<DeviceId>,
    pub timestamp: Timestamp,
    pub data: serde_json::Value,
}

impl Event {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(
        event_type: EventType,
        device_id: Option<DeviceId>,
        data: serde_json::Value,
    ) -> Self {
        Self::at(event_type, device_id, data, now())
    }

    /// Create an event with an explicit timestamp.
    #[must_use]
    pub fn at(
        event_type: EventType,
        device_id: Option<DeviceId>,
        data: serde_json::Value,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            device_id,
            timestamp,
            data,
        }
    }
}
