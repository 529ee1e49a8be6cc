//! System clock adapter.

use chrono::{DateTime, SubsecRound, Utc};

use crate::ports::clock::Clock;

/// Wall-clock time, truncated to whole seconds like Kubernetes timestamps.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}
