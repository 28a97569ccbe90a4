//! Clock port — where "now" comes from.
//!
//! Ingestion stamps and watchdog sweeps read the time through this trait so
//! tests can drive liveness with a simulated clock instead of waiting.

use harvestguard_domain::time::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

impl<T: Clock> Clock for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
