use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic time source in seconds.
///
/// Every timestamp a frame driver hands out comes from its clock, so an
/// animator's start time and the tick timestamps share one clock domain.
pub trait Clock {
    /// Current time in seconds since the clock's epoch.
    fn now(&self) -> f64;
}

/// Wall clock backed by `Instant`, with its epoch at construction.
#[derive(Debug, Copy, Clone)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Converts an `Instant` into this clock's domain.
    ///
    /// Instants taken before the epoch saturate to `0.0`.
    pub fn seconds_at(&self, instant: Instant) -> f64 {
        instant.saturating_duration_since(self.epoch).as_secs_f64()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.seconds_at(Instant::now())
    }
}

/// Hand-driven clock for deterministic driving (fixed-step loops, tests).
///
/// Clones share the same time cell.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, seconds: f64) {
        self.now.set(seconds);
    }

    /// Moves the clock forward. Negative steps are ignored to keep it monotonic.
    pub fn advance(&self, seconds: f64) {
        if seconds > 0.0 {
            self.now.set(self.now.get() + seconds);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}
