//! Frame-synchronized animation.
//!
//! A [`FrameAnimator`] turns frame ticks from a [`FrameDriver`](crate::driver::FrameDriver)
//! into linear progress in `[0, 1]` for a fixed duration. It does no easing or
//! interpolation; the update callback decides what progress means.

mod animator;
mod builder;
mod state;

pub use animator::{CompletionFn, FrameAnimator, UpdateFn};
pub use builder::AnimatorBuilder;
pub use state::AnimatorState;
