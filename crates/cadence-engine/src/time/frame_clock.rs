use std::time::Duration;

use super::clock::{Clock, MonotonicClock};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds (clamped).
    pub dt: f32,

    /// Timestamp taken at the tick, in the clock's domain.
    pub now: f64,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// `FrameClock` is designed to be used per window (or per loop) so that multi-window
/// applications do not share delta-time state.
///
/// Delta time is clamped to avoid pathological values when the application is paused
/// by the debugger, minimized, or stalls. The reported timestamp is never clamped:
/// animators compute progress from `now`, not from accumulated deltas.
#[derive(Debug, Clone)]
pub struct FrameClock<C: Clock = MonotonicClock> {
    source: C,
    last: Option<f64>,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock<MonotonicClock> {
    /// Creates a wall-clock frame clock with default clamps.
    pub fn new() -> Self {
        Self::with_source(MonotonicClock::new())
    }
}

impl<C: Clock> FrameClock<C> {
    /// Creates a clock reading from `source` with default clamps.
    ///
    /// Clamp rationale:
    /// - minimum prevents zero-dt behavior from tight loops on some platforms
    /// - maximum prevents simulation explosions after long stalls
    pub fn with_source(source: C) -> Self {
        Self::with_clamps(
            source,
            Duration::from_micros(100), // 0.0001s
            Duration::from_millis(250), // 0.25s
        )
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(source: C, dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            source,
            last: None,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    /// Current time of the underlying source, without ticking.
    pub fn now(&self) -> f64 {
        self.source.now()
    }

    /// Resets the delta baseline.
    ///
    /// Useful after surface reconfigure events or when resuming from suspension.
    pub fn reset(&mut self) {
        self.last = Some(self.source.now());
    }

    /// Advances the clock at the source's current time.
    pub fn tick(&mut self) -> FrameTime {
        let now = self.source.now();
        self.tick_at(now)
    }

    /// Advances the clock at an externally supplied timestamp.
    ///
    /// The first tick after construction reports `dt_min`.
    pub fn tick_at(&mut self, now: f64) -> FrameTime {
        let raw = match self.last {
            Some(last) if now > last => {
                Duration::try_from_secs_f64(now - last).unwrap_or(self.dt_max)
            }
            _ => Duration::ZERO,
        };

        // Clamp delta time to keep downstream systems stable.
        let dt = raw.clamp(self.dt_min, self.dt_max);

        self.last = Some(now);

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);

        ft
    }
}

impl Default for FrameClock<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}
