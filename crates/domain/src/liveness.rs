//! Liveness — online/offline classification from update recency.
//!
//! Offline detection never relies on the device announcing anything: a
//! device that fails silently simply stops refreshing its last update time,
//! and the next classification marks it offline.

use crate::time::{Span, Timestamp};

/// Result of classifying one device.
///
/// Only [`Liveness::classify`] constructs this type, which is what makes
/// the online flag of [`DeviceTelemetry`](crate::telemetry::DeviceTelemetry)
/// a pure function of its last update time and the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    online: bool,
    elapsed: Option<Span>,
}

impl Liveness {
    /// Classify a device as online when `now - last_update_at < timeout`.
    ///
    /// A device that never reported (`None`) is always offline.
    #[must_use]
    pub fn classify(last_update_at: Option<Timestamp>, now: Timestamp, timeout: Span) -> Self {
        match last_update_at {
            Some(at) => {
                let elapsed = now.signed_duration_since(at);
                Self {
                    online: elapsed < timeout,
                    elapsed: Some(elapsed),
                }
            }
            None => Self {
                online: false,
                elapsed: None,
            },
        }
    }

    #[must_use]
    pub fn is_online(self) -> bool {
        self.online
    }

    /// Time since the last update, `None` when the device never reported.
    #[must_use]
    pub fn elapsed(self) -> Option<Span> {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::seconds;

    #[test]
    fn should_be_offline_when_never_reported() {
        let liveness = Liveness::classify(None, crate::time::now(), seconds(30));
        assert!(!liveness.is_online());
        assert!(liveness.elapsed().is_none());
    }

    #[test]
    fn should_be_online_when_updated_within_timeout() {
        let now = crate::time::now();
        let liveness = Liveness::classify(Some(now - seconds(29)), now, seconds(30));
        assert!(liveness.is_online());
        assert_eq!(liveness.elapsed(), Some(seconds(29)));
    }

    #[test]
    fn should_be_offline_when_elapsed_equals_timeout() {
        let now = crate::time::now();
        let liveness = Liveness::classify(Some(now - seconds(30)), now, seconds(30));
        assert!(!liveness.is_online());
    }

    #[test]
    fn should_be_offline_when_last_update_is_31_seconds_old() {
        let now = crate::time::now();
        let liveness = Liveness::classify(Some(now - seconds(31)), now, seconds(30));
        assert!(!liveness.is_online());
    }

    #[test]
    fn should_classify_identically_when_called_twice_with_same_now() {
        let now = crate::time::now();
        let last = Some(now - seconds(12));
        assert_eq!(
            Liveness::classify(last, now, seconds(10)),
            Liveness::classify(last, now, seconds(10))
        );
    }
}
