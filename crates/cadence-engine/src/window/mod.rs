//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and pumps a `FrameLink` once per redraw.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
