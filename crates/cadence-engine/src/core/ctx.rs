use std::rc::Rc;

use winit::window::{Window, WindowId};

use crate::driver::{FrameLink, SchedulingContext};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id:     WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Returns the logical window size as `(width, height)` in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let phys  = self.window.inner_size();
        let scale = self.window.scale_factor();
        let logi: winit::dpi::LogicalSize<f64> = phys.to_logical(scale);
        (logi.width as f32, logi.height as f32)
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// By the time the app sees it, every animation attached to `context` has
/// already received this frame's tick.
pub struct FrameCtx<'a> {
    pub window:  WindowCtx<'a>,
    pub time:    FrameTime,
    /// Scheduling context this frame was dispatched under.
    pub context: SchedulingContext,
    /// Frame driver pumped by the runtime. Hand it to `FrameAnimator` factories.
    pub driver:  &'a Rc<FrameLink>,
    pub runtime: &'a mut RuntimeCtx,
}
