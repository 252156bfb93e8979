//! Wall-clock source for advisory timestamps.

use std::fmt::Debug;

use chrono::{DateTime, FixedOffset, Local};

/// Supplies the current wall-clock time to the engine.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The host's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
