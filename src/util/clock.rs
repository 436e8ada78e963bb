//! Injectable time source.
//!
//! Publication checks and cache expiry both read "now" through a [`Clock`] so
//! tests can pin and advance time deterministically.

use std::sync::Mutex;

use time::{Duration, OffsetDateTime};

use crate::cache::lock::mutex_lock;

const SOURCE: &str = "util::clock";

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn set(&self, value: OffsetDateTime) {
        *mutex_lock(&self.current, SOURCE, "set") = value;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = mutex_lock(&self.current, SOURCE, "advance");
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *mutex_lock(&self.current, SOURCE, "now")
    }
}
