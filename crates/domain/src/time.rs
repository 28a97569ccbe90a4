//! Time and timestamp helpers.

use chrono::{DateTime, TimeDelta, Utc};

/// UTC timestamp used for ingestion times, event times, etc.
pub type Timestamp = DateTime<Utc>;

/// Span between two [`Timestamp`]s (watchdog timeout, elapsed time).
pub type Span = TimeDelta;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Build a [`Span`] from whole seconds, saturating on overflow.
#[must_use]
pub fn seconds(secs: u64) -> Span {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_build_span_from_seconds() {
        assert_eq!(seconds(30), TimeDelta::seconds(30));
    }

    #[test]
    fn should_saturate_span_when_seconds_overflow() {
        assert_eq!(seconds(u64::MAX), TimeDelta::MAX);
    }
}
