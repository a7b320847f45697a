//! Cadence engine crate.
//!
//! Frame-synchronized animation: a frame driver delivers one tick per display
//! refresh, and `FrameAnimator` turns those ticks into linear progress for a
//! fixed duration. The winit runtime pumps the driver from its redraw loop.

pub mod animation;
pub mod core;
pub mod driver;
pub mod time;
pub mod window;

pub mod logging;
