//! Time subsystem.
//!
//! Provides stable, testable frame timing utilities without coupling to the runtime.
//! Intended usage:
//! - one `FrameClock` per window (or per render loop)
//! - call `tick()` once per presented frame to obtain `FrameTime`
//! - swap in a `ManualClock` to drive frames deterministically

mod clock;
mod frame_clock;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use frame_clock::{FrameClock, FrameTime};
