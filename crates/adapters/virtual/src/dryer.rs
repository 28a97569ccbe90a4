//! Virtual grain dryer — a deterministic model of one unit.
//!
//! Every tick the model looks at the actuator state the engine last
//! commanded and moves its readings accordingly:
//!
//! | Condition | Humidity per tick |
//! |-----------|-------------------|
//! | raining | `+RAIN_GAIN` |
//! | roof open, shaker on | `-(DRYING_RATE + SHAKER_BONUS)` |
//! | roof open, shaker off | `-DRYING_RATE` |
//! | roof closed, dry | unchanged |
//!
//! Rain follows a fixed schedule: the last `RAIN_TICKS` ticks of every
//! `RAIN_PERIOD`. Temperature drifts toward a warm value in the sun and a
//! cool one otherwise.

use harvestguard_domain::actuator::ActuatorState;
use harvestguard_domain::id::DeviceId;
use harvestguard_domain::telemetry::TelemetryReading;

const RAIN_PERIOD: u64 = 40;
const RAIN_TICKS: u64 = 6;
const RAIN_GAIN: f64 = 0.6;
const DRYING_RATE: f64 = 0.25;
const SHAKER_BONUS: f64 = 0.2;
const MIN_HUMIDITY: f64 = 8.0;
const MAX_HUMIDITY: f64 = 35.0;
const SUNNY_TEMPERATURE: f64 = 44.0;
const SHADE_TEMPERATURE: f64 = 31.0;
const TEMPERATURE_DRIFT: f64 = 0.15;

/// One simulated dryer.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualDryer {
    device_id: DeviceId,
    tick: u64,
    humidity: f64,
    temperature: f64,
}

impl VirtualDryer {
    /// A dryer loaded with wet grain.
    ///
    /// `index` staggers the starting humidity and the rain schedule so that
    /// several dryers do not move in lockstep.
    #[must_use]
    pub fn new(device_id: DeviceId, index: u32) -> Self {
        Self {
            device_id,
            tick: u64::from(index) * 7,
            humidity: 20.0 + f64::from(index % 5) * 1.5,
            temperature: SHADE_TEMPERATURE,
        }
    }

    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    #[must_use]
    pub fn is_raining(&self) -> bool {
        self.tick % RAIN_PERIOD >= RAIN_PERIOD - RAIN_TICKS
    }

    /// The reading the dryer reports right now.
    #[must_use]
    pub fn reading(&self) -> TelemetryReading {
        let raining = self.is_raining();
        TelemetryReading {
            temperature: self.temperature,
            humidity: self.humidity,
            is_rain_detected: raining,
            is_sunny: !raining,
        }
    }

    /// Advance one tick under `actuator` and return the new reading.
    pub fn step(&mut self, actuator: ActuatorState) -> TelemetryReading {
        let raining = self.is_raining();
        let delta = if raining {
            RAIN_GAIN
        } else if actuator.roof_open && actuator.shaker_on {
            -(DRYING_RATE + SHAKER_BONUS)
        } else if actuator.roof_open {
            -DRYING_RATE
        } else {
            0.0
        };
        self.humidity = (self.humidity + delta).clamp(MIN_HUMIDITY, MAX_HUMIDITY);

        let toward = if !raining && actuator.roof_open {
            SUNNY_TEMPERATURE
        } else {
            SHADE_TEMPERATURE
        };
        self.temperature += (toward - self.temperature) * TEMPERATURE_DRIFT;

        self.tick += 1;
        self.reading()
    }
}
