use std::rc::Rc;
use std::time::Duration;

use crate::driver::{FrameDriver, SchedulingContext};

use super::animator::{CompletionFn, FrameAnimator, UpdateFn};

/// Configures and starts a [`FrameAnimator`].
///
/// ```rust,ignore
/// let fade = FrameAnimator::builder(0.3)
///     .on_update(move |p| overlay.set_alpha(p as f32))
///     .on_complete(|| log::info!("faded in"))
///     .contexts(SchedulingContext::common())
///     .start(driver.clone());
/// ```
pub struct AnimatorBuilder {
    duration:   f64,
    update:     Option<UpdateFn>,
    completion: Option<CompletionFn>,
    /// `None` means "use the default context".
    contexts:   Option<Vec<SchedulingContext>>,
}

impl AnimatorBuilder {
    /// `duration` is in seconds.
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            update:     None,
            completion: None,
            contexts:   None,
        }
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self::new(duration.as_secs_f64())
    }

    /// Set the per-frame callback. Receives progress in `[0, 1]`.
    pub fn on_update(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.update = Some(Box::new(f));
        self
    }

    /// Set the callback run once after the final `1.0` update.
    pub fn on_complete(mut self, f: impl FnOnce() + 'static) -> Self {
        self.completion = Some(Box::new(f));
        self
    }

    /// Add one scheduling context to deliver under.
    pub fn context(mut self, context: SchedulingContext) -> Self {
        let contexts = self.contexts.get_or_insert_with(Vec::new);
        if !contexts.contains(&context) {
            contexts.push(context);
        }
        self
    }

    /// Replace the set of scheduling contexts. Duplicates are dropped.
    pub fn contexts(mut self, contexts: impl IntoIterator<Item = SchedulingContext>) -> Self {
        self.contexts = Some(Vec::new());
        for context in contexts {
            self = self.context(context);
        }
        self
    }

    /// Subscribe to `driver` and fire the initial `0.0` update.
    pub fn start(self, driver: Rc<dyn FrameDriver>) -> FrameAnimator {
        let update = self.update.unwrap_or_else(|| Box::new(|_: f64| {}));
        let contexts = self
            .contexts
            .unwrap_or_else(|| vec![SchedulingContext::default()]);

        FrameAnimator::start(driver, self.duration, update, self.completion, contexts)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::animation::AnimatorState;
    use crate::driver::FrameLink;
    use crate::time::ManualClock;

    fn link() -> Rc<FrameLink<ManualClock>> {
        Rc::new(FrameLink::with_clock(ManualClock::new(0.0)))
    }

    #[test]
    fn from_duration_converts_to_seconds() {
        let anim = AnimatorBuilder::from_duration(Duration::from_millis(250)).start(link());
        assert_eq!(anim.duration(), 0.25);
        anim.cancel();
    }

    #[test]
    fn defaults_to_standard_context() {
        let anim = AnimatorBuilder::new(1.0).start(link());
        assert_eq!(anim.contexts(), &[SchedulingContext::Default]);
        anim.cancel();
    }

    #[test]
    fn context_additions_are_deduplicated() {
        let anim = AnimatorBuilder::new(1.0)
            .context(SchedulingContext::Tracking)
            .context(SchedulingContext::Tracking)
            .context(SchedulingContext::Named("modal"))
            .start(link());
        assert_eq!(
            anim.contexts(),
            &[SchedulingContext::Tracking, SchedulingContext::Named("modal")]
        );
        anim.cancel();
    }

    #[test]
    fn contexts_replaces_previous_set() {
        let anim = AnimatorBuilder::new(1.0)
            .context(SchedulingContext::Named("modal"))
            .contexts([SchedulingContext::Default, SchedulingContext::Default])
            .start(link());
        assert_eq!(anim.contexts(), &[SchedulingContext::Default]);
        anim.cancel();
    }

    #[test]
    fn runs_without_update_callback() {
        let link = link();
        let done = Rc::new(Cell::new(false));
        let d = Rc::clone(&done);
        let anim = AnimatorBuilder::new(0.5)
            .on_complete(move || d.set(true))
            .start(link.clone());

        link.dispatch_at(SchedulingContext::Default, 0.5);
        assert!(done.get());
        assert_eq!(anim.state(), AnimatorState::Completed);
        assert_eq!(anim.last_progress(), 1.0);
    }
}
