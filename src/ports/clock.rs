//! Clock port used to stamp condition transitions.

use chrono::{DateTime, Utc};

/// Provides the current time.
///
/// Injected so tests can pin `lastTransitionTime` values.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}
