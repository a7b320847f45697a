use std::fmt;

use super::context::SchedulingContext;

/// Opaque handle to a frame subscription.
///
/// Ids are never reused by a driver, so a stale id is always safe to pass back.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Tick record handed to every subscription on a display refresh.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTick {
    /// Timestamp of this frame, in the driver's clock domain (seconds).
    pub timestamp: f64,

    /// Expected timestamp of the next frame.
    pub target_timestamp: f64,

    /// Context the tick is being delivered under.
    pub context: SchedulingContext,

    /// Monotonic frame counter of the dispatching driver.
    pub frame_index: u64,
}

impl FrameTick {
    /// Time until the next expected frame, in seconds.
    pub fn interval(&self) -> f64 {
        self.target_timestamp - self.timestamp
    }
}
