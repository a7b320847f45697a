//! Frame driver subsystem.
//!
//! A frame driver delivers a callback once per display refresh. Animators only
//! talk to the [`FrameDriver`] trait; [`FrameLink`] is the in-process
//! implementation the runtime pumps from its redraw loop. Any other periodic
//! source (a fixed-rate timer, a test harness) can drive a `FrameLink`
//! through [`FrameLink::dispatch_at`].
//!
//! Drivers are single-threaded: every method takes `&self` and uses interior
//! mutability, so a driver is shared through `Rc` on the thread that pumps it.

mod context;
mod link;
mod tick;

pub use context::SchedulingContext;
pub use link::FrameLink;
pub use tick::{FrameTick, SubscriptionId};

/// Per-frame callback registered with a driver.
pub type TickHandler = Box<dyn FnMut(&FrameTick)>;

/// Platform capability delivering one tick per display refresh.
pub trait FrameDriver {
    /// Current time in the driver's clock domain, in seconds.
    ///
    /// Tick timestamps are comparable with values returned here.
    fn now(&self) -> f64;

    /// Registers `handler`. It receives nothing until attached to a context.
    fn subscribe(&self, handler: TickHandler) -> SubscriptionId;

    /// Removes a subscription. Idempotent.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Suspends or resumes delivery without unsubscribing.
    fn set_paused(&self, id: SubscriptionId, paused: bool);

    /// Allows delivery to `id` while `context` is being dispatched.
    fn attach(&self, id: SubscriptionId, context: SchedulingContext);
}
