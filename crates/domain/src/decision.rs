//! Decision engine — the pure transition from telemetry to actuator state.
//!
//! Rules, in priority order:
//!
//! 1. The roof mirrors the rain sensor: open unless rain is detected.
//! 2. Grain is *ready* when `humidity <= target` (inclusive).
//! 3. Ready and not pouring: start pouring, stop the shaker.
//! 4. Already pouring: keep pouring, shaker stays off. Only an explicit
//!    [`stop_pour`] ends a pour.
//! 5. Otherwise the shaker follows the operator's request if there is one,
//!    or keeps its current state.
//!
//! A shaker request made while ready or pouring is rejected, which is a
//! normal outcome ([`ShakerOutcome::Rejected`]), not an error. A rejected
//! request leaves the whole state untouched; the next cycle without a
//! request applies rules 1 to 4 as usual.

use serde::{Deserialize, Serialize};

use crate::actuator::{ActuatorState, TargetMoisture};
use crate::telemetry::TelemetryReading;

/// Why a shaker request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    /// Target moisture reached; the pour is about to start.
    Ready,
    /// A pour is in progress.
    Pouring,
}

impl std::fmt::Display for LockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::Pouring => f.write_str("pouring"),
        }
    }
}

/// What happened to the shaker request of a decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShakerOutcome {
    NotRequested,
    Applied,
    Rejected(LockReason),
}

/// Result of one decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub next: ActuatorState,
    pub shaker: ShakerOutcome,
    /// Whether the reading met the target moisture.
    pub ready: bool,
    /// Whether this cycle started a pour.
    pub pour_started: bool,
}

impl Decision {
    /// Whether a shaker request was refused (`shaker-locked`).
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self.shaker, ShakerOutcome::Rejected(_))
    }
}

/// Compute the next actuator state.
///
/// `shaker_request` carries an operator toggle; `None` for a scheduled cycle.
///
/// Total over its domain: any combination of numbers and flags yields a
/// decision. A `NaN` humidity compares as not ready.
#[must_use]
pub fn decide(
    reading: &TelemetryReading,
    current: ActuatorState,
    target: TargetMoisture,
    shaker_request: Option<bool>,
) -> Decision {
    let roof_open = follow_weather(current, reading).roof_open;
    let ready = target.is_reached_by(reading.humidity);

    let lock = if current.is_pouring {
        Some(LockReason::Pouring)
    } else if ready {
        Some(LockReason::Ready)
    } else {
        None
    };

    if let (Some(_), Some(reason)) = (shaker_request, lock) {
        return Decision {
            next: current,
            shaker: ShakerOutcome::Rejected(reason),
            ready,
            pour_started: false,
        };
    }

    let shaker = if shaker_request.is_some() {
        ShakerOutcome::Applied
    } else {
        ShakerOutcome::NotRequested
    };

    let next = if ready || current.is_pouring {
        ActuatorState {
            roof_open,
            shaker_on: false,
            is_pouring: true,
        }
    } else {
        ActuatorState {
            roof_open,
            shaker_on: shaker_request.unwrap_or(current.shaker_on),
            is_pouring: false,
        }
    };

    Decision {
        next,
        shaker,
        ready,
        pour_started: next.is_pouring && !current.is_pouring,
    }
}

/// Rule 1 on its own: the roof mirrors the rain sensor, nothing else moves.
///
/// Applied as soon as a reading is stored, so the roof never lags the
/// weather by a decision cadence.
#[must_use]
pub fn follow_weather(current: ActuatorState, reading: &TelemetryReading) -> ActuatorState {
    ActuatorState {
        roof_open: !reading.is_rain_detected,
        ..current
    }
}

/// Operator stop: end any pour and go back to drying.
///
/// Applied unconditionally. If the grain is still ready, the next
/// [`decide`] call starts a new pour.
#[must_use]
pub fn stop_pour(current: ActuatorState) -> ActuatorState {
    ActuatorState {
        roof_open: current.roof_open,
        shaker_on: true,
        is_pouring: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::DryingPhase;

    fn target() -> TargetMoisture {
        TargetMoisture::new(14.0).unwrap()
    }

    fn reading(humidity: f64, is_rain_detected: bool) -> TelemetryReading {
        TelemetryReading {
            temperature: 41.5,
            humidity,
            is_rain_detected,
            is_sunny: false,
        }
    }

    fn drying() -> ActuatorState {
        ActuatorState::default()
    }

    fn pouring() -> ActuatorState {
        ActuatorState {
            roof_open: true,
            shaker_on: false,
            is_pouring: true,
        }
    }

    fn all_states() -> Vec<ActuatorState> {
        let mut states = Vec::new();
        for roof_open in [true, false] {
            for shaker_on in [true, false] {
                for is_pouring in [true, false] {
                    if shaker_on && is_pouring {
                        continue;
                    }
                    states.push(ActuatorState {
                        roof_open,
                        shaker_on,
                        is_pouring,
                    });
                }
            }
        }
        states
    }

    const HUMIDITIES: [f64; 9] = [0.0, 10.0, 13.9, 14.0, 14.000_001, 16.0, 30.0, -5.0, f64::NAN];
    const REQUESTS: [Option<bool>; 3] = [None, Some(true), Some(false)];

    #[test]
    fn should_allow_shaker_toggle_when_not_ready() {
        let decision = decide(&reading(16.0, false), drying(), target(), Some(true));
        assert!(!decision.ready);
        assert_eq!(decision.shaker, ShakerOutcome::Applied);
        assert_eq!(decision.next.phase(), DryingPhase::Drying);
    }

    #[test]
    fn should_switch_shaker_off_when_operator_requests_it() {
        let decision = decide(&reading(16.0, false), drying(), target(), Some(false));
        assert_eq!(decision.shaker, ShakerOutcome::Applied);
        assert!(!decision.next.shaker_on);
        assert_eq!(decision.next.phase(), DryingPhase::Idle);
    }

    #[test]
    fn should_start_pouring_when_humidity_below_target() {
        let decision = decide(&reading(13.9, false), drying(), target(), None);
        assert!(decision.next.is_pouring);
        assert!(!decision.next.shaker_on);
        assert!(decision.pour_started);
    }

    #[test]
    fn should_start_pouring_when_humidity_equals_target() {
        let decision = decide(&reading(14.0, false), drying(), target(), None);
        assert!(decision.ready);
        assert!(decision.next.is_pouring);
    }

    #[test]
    fn should_start_pouring_from_idle_when_ready() {
        let idle = ActuatorState {
            roof_open: true,
            shaker_on: false,
            is_pouring: false,
        };
        let decision = decide(&reading(12.0, false), idle, target(), None);
        assert_eq!(decision.next.phase(), DryingPhase::Pouring);
    }

    #[test]
    fn should_reject_shaker_request_while_pouring() {
        let current = pouring();
        let decision = decide(&reading(13.0, false), current, target(), Some(true));
        assert_eq!(decision.shaker, ShakerOutcome::Rejected(LockReason::Pouring));
        assert_eq!(decision.next, current);
        assert!(!decision.pour_started);
    }

    #[test]
    fn should_reject_shaker_request_when_ready() {
        let decision = decide(&reading(13.0, false), drying(), target(), Some(true));
        assert_eq!(decision.shaker, ShakerOutcome::Rejected(LockReason::Ready));
        assert!(decision.is_rejected());
        assert_eq!(decision.next, drying());
    }

    #[test]
    fn should_start_pour_on_cycle_following_rejected_request() {
        let rejected = decide(&reading(13.0, false), drying(), target(), Some(false));
        let decision = decide(&reading(13.0, false), rejected.next, target(), None);
        assert!(decision.pour_started);
    }

    #[test]
    fn should_close_roof_when_raining_in_any_phase() {
        for state in all_states() {
            for humidity in HUMIDITIES {
                let decision = decide(&reading(humidity, true), state, target(), None);
                assert!(!decision.next.roof_open, "{state:?} at {humidity}");
            }
        }
    }

    #[test]
    fn should_mirror_rain_sensor_on_roof_for_every_input() {
        for state in all_states() {
            for humidity in HUMIDITIES {
                for rain in [true, false] {
                    for request in REQUESTS {
                        let decision = decide(&reading(humidity, rain), state, target(), request);
                        if decision.is_rejected() {
                            assert_eq!(decision.next, state);
                        } else {
                            assert_eq!(decision.next.roof_open, !rain);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn should_never_run_shaker_while_pouring_for_every_input() {
        for state in all_states() {
            for humidity in HUMIDITIES {
                for rain in [true, false] {
                    for request in REQUESTS {
                        let decision = decide(&reading(humidity, rain), state, target(), request);
                        assert!(decision.next.interlock_holds());
                    }
                }
            }
        }
    }

    #[test]
    fn should_only_move_roof_when_following_weather() {
        for state in all_states() {
            for raining in [true, false] {
                let next = follow_weather(state, &reading(13.0, raining));
                assert_eq!(next.roof_open, !raining);
                assert_eq!(next.shaker_on, state.shaker_on);
                assert_eq!(next.is_pouring, state.is_pouring);
            }
        }
    }

    #[test]
    fn should_keep_pouring_regardless_of_later_humidity() {
        let mut state = decide(&reading(13.0, false), drying(), target(), None).next;
        for humidity in [20.0, 35.0, 14.5, 16.0, f64::NAN] {
            state = decide(&reading(humidity, false), state, target(), None).next;
            assert!(state.is_pouring, "pour cleared at humidity {humidity}");
        }
    }

    #[test]
    fn should_return_to_drying_when_pour_stopped() {
        let stopped = stop_pour(pouring());
        assert_eq!(stopped.phase(), DryingPhase::Drying);
        assert!(stopped.roof_open);
    }

    #[test]
    fn should_reenter_pouring_after_stop_when_still_ready() {
        let stopped = stop_pour(pouring());
        let decision = decide(&reading(13.0, false), stopped, target(), None);
        assert!(decision.next.is_pouring);
        assert!(decision.pour_started);
    }

    #[test]
    fn should_keep_drying_after_stop_when_no_longer_ready() {
        let stopped = stop_pour(pouring());
        let decision = decide(&reading(18.0, false), stopped, target(), None);
        assert_eq!(decision.next.phase(), DryingPhase::Drying);
    }

    #[test]
    fn should_carry_shaker_state_when_no_request() {
        let idle = ActuatorState {
            roof_open: true,
            shaker_on: false,
            is_pouring: false,
        };
        let decision = decide(&reading(20.0, false), idle, target(), None);
        assert_eq!(decision.shaker, ShakerOutcome::NotRequested);
        assert!(!decision.next.shaker_on);
    }
}
