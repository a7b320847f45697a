use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::driver::{FrameDriver, FrameTick, SchedulingContext, SubscriptionId};

use super::builder::AnimatorBuilder;
use super::state::AnimatorState;

/// Receives normalized progress in `[0, 1]`.
pub type UpdateFn = Box<dyn FnMut(f64)>;

/// Runs once when an animation reaches progress 1.
pub type CompletionFn = Box<dyn FnOnce()>;

struct Shared {
    duration: f64,
    start_time: f64,
    contexts: Vec<SchedulingContext>,
    driver: Weak<dyn FrameDriver>,

    subscription: Cell<Option<SubscriptionId>>,
    state: Cell<AnimatorState>,
    last_progress: Cell<f64>,

    /// Dropped once the animation finishes so captured handles can't keep it alive.
    update: RefCell<Option<UpdateFn>>,
    completion: RefCell<Option<CompletionFn>>,
}

impl Shared {
    fn deliver(&self, progress: f64) {
        self.last_progress.set(progress);
        let mut slot = self.update.borrow_mut();
        if let Some(update) = slot.as_mut() {
            update(progress);
        }

        // A cancel from inside the callback could not release it while borrowed.
        let finished = if self.state.get().is_terminal() {
            slot.take()
        } else {
            None
        };
        drop(slot);
        drop(finished);
    }

    /// Releases both callbacks. Skipped while the update callback is running;
    /// `deliver` finishes the job once it returns.
    fn drop_callbacks(&self) {
        let completion = self.completion.borrow_mut().take();
        drop(completion);

        let update = match self.update.try_borrow_mut() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        drop(update);
    }

    fn on_tick(&self, tick: &FrameTick) {
        if self.state.get() != AnimatorState::Running {
            return;
        }

        // Drivers may stamp the first frame slightly before construction time.
        let progress = ((tick.timestamp - self.start_time) / self.duration).max(0.0);
        log::trace!("animation progress {progress:.4} (frame {})", tick.frame_index);

        if progress < 1.0 {
            self.deliver(progress);
        } else {
            self.deliver(1.0);
            self.complete();
        }
    }

    fn complete(&self) {
        // The final update may have cancelled us.
        if self.state.get().is_terminal() {
            return;
        }

        self.state.set(AnimatorState::Completed);
        log::debug!("animation completed ({:.3}s)", self.duration);

        let completion = self.completion.borrow_mut().take();
        if let Some(done) = completion {
            done();
        }

        self.release();
        self.drop_callbacks();
    }

    fn release(&self) {
        let Some(id) = self.subscription.take() else {
            return;
        };
        if let Some(driver) = self.driver.upgrade() {
            driver.unsubscribe(id);
        }
    }
}

/// Drives a callback with linear progress on every frame tick for a fixed duration.
///
/// The update callback is invoked with `0.0` before the factory returns, then
/// once per tick with `elapsed / duration`. The first tick at or past the
/// duration delivers exactly `1.0`, runs the completion callback and releases
/// the frame subscription.
///
/// `FrameAnimator` is a cheap handle; clones control the same animation.
/// Dropping every handle does not stop the animation: the driver keeps it
/// alive until it completes or [`cancel`](Self::cancel) is called.
///
/// Pausing suspends delivery but not time. On resume, progress reflects the
/// wall-clock time that passed while paused.
///
/// Non-positive (or NaN) durations complete during construction: the update
/// callback sees `0.0` then `1.0`, the completion callback runs, and no
/// subscription is made.
#[derive(Clone)]
pub struct FrameAnimator {
    shared: Rc<Shared>,
}

impl FrameAnimator {
    /// Starts configuring an animation of `duration` seconds.
    pub fn builder(duration: f64) -> AnimatorBuilder {
        AnimatorBuilder::new(duration)
    }

    /// Animates under the default scheduling context with no completion callback.
    pub fn animate<U>(driver: Rc<dyn FrameDriver>, duration: f64, update: U) -> Self
    where
        U: FnMut(f64) + 'static,
    {
        Self::builder(duration).on_update(update).start(driver)
    }

    /// Animates under the default scheduling context.
    pub fn animate_with_completion<U, F>(
        driver: Rc<dyn FrameDriver>,
        duration: f64,
        update: U,
        completion: F,
    ) -> Self
    where
        U: FnMut(f64) + 'static,
        F: FnOnce() + 'static,
    {
        Self::builder(duration)
            .on_update(update)
            .on_complete(completion)
            .start(driver)
    }

    /// Animates under an explicit set of scheduling contexts.
    ///
    /// An empty set subscribes without attaching anywhere, so no tick is ever
    /// delivered until the animation is cancelled.
    pub fn animate_with_options<U, I>(
        driver: Rc<dyn FrameDriver>,
        duration: f64,
        update: U,
        completion: Option<CompletionFn>,
        contexts: I,
    ) -> Self
    where
        U: FnMut(f64) + 'static,
        I: IntoIterator<Item = SchedulingContext>,
    {
        let mut builder = Self::builder(duration).on_update(update).contexts(contexts);
        if let Some(done) = completion {
            builder = builder.on_complete(done);
        }
        builder.start(driver)
    }

    pub(super) fn start(
        driver: Rc<dyn FrameDriver>,
        duration: f64,
        update: UpdateFn,
        completion: Option<CompletionFn>,
        contexts: Vec<SchedulingContext>,
    ) -> Self {
        let shared = Rc::new(Shared {
            duration,
            start_time: driver.now(),
            contexts,
            driver: Rc::downgrade(&driver),
            subscription: Cell::new(None),
            state: Cell::new(AnimatorState::Running),
            last_progress: Cell::new(0.0),
            update: RefCell::new(Some(update)),
            completion: RefCell::new(completion),
        });

        if duration.is_nan() || duration <= 0.0 {
            log::warn!("animation duration {duration} is not positive; completing immediately");
            shared.deliver(0.0);
            if shared.state.get() == AnimatorState::Running {
                shared.deliver(1.0);
                shared.complete();
            }
            return Self { shared };
        }

        if shared.contexts.is_empty() {
            log::warn!("animation attached to no scheduling context; it will never tick");
        }

        let handler = Rc::clone(&shared);
        let id = driver.subscribe(Box::new(move |tick: &FrameTick| handler.on_tick(tick)));
        for context in &shared.contexts {
            driver.attach(id, *context);
        }
        shared.subscription.set(Some(id));

        log::debug!(
            "animation started: {duration:.3}s on {id} ({} context(s))",
            shared.contexts.len()
        );

        shared.deliver(0.0);

        Self { shared }
    }

    /// Stops the animation and releases its frame subscription.
    ///
    /// Idempotent, safe after completion, and never runs the completion callback.
    /// No callback fires for this animation once `cancel` returns.
    pub fn cancel(&self) {
        let s = &self.shared;
        if !s.state.get().is_terminal() {
            s.state.set(AnimatorState::Cancelled);
            log::debug!("animation cancelled at {:.4}", s.last_progress.get());
        }
        s.release();
        s.drop_callbacks();
    }

    pub fn paused(&self) -> bool {
        self.shared.state.get().is_paused()
    }

    /// Suspends or resumes tick delivery. Ignored once the animation has finished.
    pub fn set_paused(&self, paused: bool) {
        let s = &self.shared;
        let next = match (s.state.get(), paused) {
            (AnimatorState::Running, true) => AnimatorState::Paused,
            (AnimatorState::Paused, false) => AnimatorState::Running,
            (state, _) => {
                if state.is_terminal() {
                    log::debug!("ignoring pause toggle on {state:?} animation");
                }
                return;
            }
        };

        s.state.set(next);
        if let (Some(id), Some(driver)) = (s.subscription.get(), s.driver.upgrade()) {
            driver.set_paused(id, paused);
        }
        log::debug!("animation {}", if paused { "paused" } else { "resumed" });
    }

    /// Duration in seconds, as given at construction.
    pub fn duration(&self) -> f64 {
        self.shared.duration
    }

    /// Construction time in the driver's clock domain.
    pub fn start_time(&self) -> f64 {
        self.shared.start_time
    }

    pub fn state(&self) -> AnimatorState {
        self.shared.state.get()
    }

    pub fn is_finished(&self) -> bool {
        self.shared.state.get().is_terminal()
    }

    /// Last progress value handed to the update callback.
    pub fn last_progress(&self) -> f64 {
        self.shared.last_progress.get()
    }

    pub fn contexts(&self) -> &[SchedulingContext] {
        &self.shared.contexts
    }

    /// Live frame subscription, if any.
    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.shared.subscription.get()
    }
}

impl fmt::Debug for FrameAnimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameAnimator")
            .field("duration", &self.shared.duration)
            .field("state", &self.shared.state.get())
            .field("last_progress", &self.shared.last_progress.get())
            .field("subscription", &self.shared.subscription.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::FrameLink;
    use crate::time::ManualClock;

    const DEFAULT: SchedulingContext = SchedulingContext::Default;
    const TRACKING: SchedulingContext = SchedulingContext::Tracking;

    fn rig(start: f64) -> Rc<FrameLink<ManualClock>> {
        Rc::new(FrameLink::with_clock(ManualClock::new(start)))
    }

    #[derive(Default)]
    struct Recorder {
        values: Rc<RefCell<Vec<f64>>>,
        completions: Rc<Cell<u32>>,
    }

    impl Recorder {
        fn update(&self) -> UpdateFn {
            let values = Rc::clone(&self.values);
            Box::new(move |p: f64| values.borrow_mut().push(p))
        }

        fn completion(&self) -> CompletionFn {
            let completions = Rc::clone(&self.completions);
            Box::new(move || completions.set(completions.get() + 1))
        }

        fn values(&self) -> Vec<f64> {
            self.values.borrow().clone()
        }

        fn completions(&self) -> u32 {
            self.completions.get()
        }
    }

    /// Flips its flag when dropped, to observe when a callback is released.
    struct DropFlag(Rc<Cell<bool>>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    fn drop_flag() -> (DropFlag, Rc<Cell<bool>>) {
        let flag = Rc::new(Cell::new(false));
        (DropFlag(Rc::clone(&flag)), flag)
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn initial_update_is_synchronous() {
        let link = rig(5.0);
        let rec = Recorder::default();
        let anim = FrameAnimator::animate(link.clone(), 1.0, rec.update());

        assert_eq!(rec.values(), vec![0.0]);
        assert_eq!(anim.state(), AnimatorState::Running);
        assert_eq!(anim.start_time(), 5.0);
        assert_eq!(anim.duration(), 1.0);
        assert_eq!(anim.contexts(), &[DEFAULT]);
        assert_eq!(link.len(), 1);
        assert!(anim.subscription().is_some_and(|id| link.is_subscribed(id)));
    }

    #[test]
    fn zero_duration_completes_immediately() {
        for duration in [0.0, -1.0, f64::NAN, f64::NEG_INFINITY] {
            let link = rig(0.0);
            let rec = Recorder::default();
            let anim =
                FrameAnimator::animate_with_completion(link.clone(), duration, rec.update(), rec.completion());

            assert_eq!(rec.values(), vec![0.0, 1.0]);
            assert_eq!(rec.completions(), 1);
            assert_eq!(anim.state(), AnimatorState::Completed);
            assert_eq!(anim.subscription(), None);
            assert!(link.is_empty());
        }
    }

    #[test]
    fn infinite_duration_never_completes() {
        let link = rig(0.0);
        let rec = Recorder::default();
        let anim = FrameAnimator::animate(link.clone(), f64::INFINITY, rec.update());

        link.dispatch_at(DEFAULT, 1.0e6);
        assert_eq!(rec.values(), vec![0.0, 0.0]);
        assert_eq!(anim.state(), AnimatorState::Running);
        anim.cancel();
    }

    // ── ticking ───────────────────────────────────────────────────────────

    #[test]
    fn one_second_scenario() {
        let link = rig(100.0);
        let rec = Recorder::default();
        let anim =
            FrameAnimator::animate_with_completion(link.clone(), 1.0, rec.update(), rec.completion());

        link.dispatch_at(DEFAULT, 100.0);
        link.dispatch_at(DEFAULT, 100.5);
        assert_eq!(rec.completions(), 0);

        link.dispatch_at(DEFAULT, 101.0);
        assert_eq!(rec.completions(), 1);

        assert_eq!(link.dispatch_at(DEFAULT, 101.5), 0);

        // Construction update, then one per tick up to completion.
        assert_eq!(rec.values(), vec![0.0, 0.0, 0.5, 1.0]);
        assert_eq!(rec.completions(), 1);
        assert_eq!(anim.state(), AnimatorState::Completed);
        assert_eq!(anim.last_progress(), 1.0);
        assert!(link.is_empty());
    }

    #[test]
    fn progress_is_monotonic_and_ends_with_single_one() {
        let link = rig(0.0);
        let rec = Recorder::default();
        let _anim = FrameAnimator::animate(link.clone(), 0.5, rec.update());

        for frame in 1..=60 {
            link.dispatch_at(DEFAULT, f64::from(frame) / 60.0);
        }

        let values = rec.values();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(values.iter().filter(|p| **p == 1.0).count(), 1);
        assert_eq!(values.last(), Some(&1.0));
    }

    #[test]
    fn late_overshoot_is_clamped_to_one() {
        let link = rig(0.0);
        let rec = Recorder::default();
        let _anim = FrameAnimator::animate(link.clone(), 1.0, rec.update());

        link.dispatch_at(DEFAULT, 7.0);
        assert_eq!(rec.values(), vec![0.0, 1.0]);
    }

    #[test]
    fn tick_before_start_reports_zero() {
        let link = rig(10.0);
        let rec = Recorder::default();
        let _anim = FrameAnimator::animate(link.clone(), 1.0, rec.update());

        link.dispatch_at(DEFAULT, 9.5);
        assert_eq!(rec.values(), vec![0.0, 0.0]);
    }

    #[test]
    fn handle_drop_does_not_stop_animation() {
        let link = rig(0.0);
        let rec = Recorder::default();
        drop(FrameAnimator::animate_with_completion(
            link.clone(),
            1.0,
            rec.update(),
            rec.completion(),
        ));

        link.dispatch_at(DEFAULT, 0.5);
        link.dispatch_at(DEFAULT, 1.0);
        assert_eq!(rec.values(), vec![0.0, 0.5, 1.0]);
        assert_eq!(rec.completions(), 1);
        assert!(link.is_empty());
    }

    // ── cancellation ──────────────────────────────────────────────────────

    #[test]
    fn cancel_mid_animation_stops_updates() {
        let link = rig(0.0);
        let rec = Recorder::default();
        let anim =
            FrameAnimator::animate_with_completion(link.clone(), 2.0, rec.update(), rec.completion());

        link.dispatch_at(DEFAULT, 1.0);
        anim.cancel();
        link.dispatch_at(DEFAULT, 1.5);
        link.dispatch_at(DEFAULT, 2.0);

        assert_eq!(rec.values(), vec![0.0, 0.5]);
        assert_eq!(rec.completions(), 0);
        assert_eq!(anim.state(), AnimatorState::Cancelled);
        assert!(link.is_empty());
    }

    #[test]
    fn cancel_is_idempotent_and_noop_after_completion() {
        let link = rig(0.0);
        let rec = Recorder::default();
        let anim =
            FrameAnimator::animate_with_completion(link.clone(), 1.0, rec.update(), rec.completion());

        link.dispatch_at(DEFAULT, 1.0);
        anim.cancel();
        anim.cancel();

        assert_eq!(rec.completions(), 1);
        assert_eq!(anim.state(), AnimatorState::Completed);
    }

    #[test]
    fn cancel_from_a_clone_is_seen_by_all_handles() {
        let link = rig(0.0);
        let anim = FrameAnimator::animate(link.clone(), 1.0, |_| {});
        let other = anim.clone();

        other.cancel();
        assert!(anim.is_finished());
        assert_eq!(anim.subscription(), None);
    }

    #[test]
    fn cancel_inside_update_suppresses_completion() {
        let link = rig(0.0);
        let rec = Recorder::default();
        let slot: Rc<RefCell<Option<FrameAnimator>>> = Rc::default();

        let (guard, released) = drop_flag();

        let values = Rc::clone(&rec.values);
        let s = Rc::clone(&slot);
        let anim = FrameAnimator::animate_with_completion(
            link.clone(),
            1.0,
            move |p| {
                let _ = &guard;
                values.borrow_mut().push(p);
                if p >= 1.0 {
                    if let Some(a) = s.borrow().as_ref() {
                        a.cancel();
                    }
                }
            },
            rec.completion(),
        );
        *slot.borrow_mut() = Some(anim.clone());

        link.dispatch_at(DEFAULT, 1.0);

        assert_eq!(rec.values(), vec![0.0, 1.0]);
        assert_eq!(rec.completions(), 0);
        assert_eq!(anim.state(), AnimatorState::Cancelled);
        assert!(link.is_empty());
        assert!(released.get());
    }

    #[test]
    fn update_callback_is_released_after_completion() {
        let link = rig(0.0);
        let slot: Rc<RefCell<Option<FrameAnimator>>> = Rc::default();
        let (guard, released) = drop_flag();

        let s = Rc::clone(&slot);
        let anim = FrameAnimator::animate(link.clone(), 1.0, move |_| {
            let _ = (&guard, &s);
        });
        *slot.borrow_mut() = Some(anim);
        // Only the update closure now reaches the animator.
        drop(slot);

        link.dispatch_at(DEFAULT, 2.0);

        assert!(link.is_empty());
        assert!(released.get());
    }

    #[test]
    fn update_callback_is_released_on_cancel() {
        let link = rig(0.0);
        let (guard, released) = drop_flag();
        let anim = FrameAnimator::animate(link.clone(), 1.0, move |_| {
            let _ = &guard;
        });

        assert!(!released.get());
        anim.cancel();
        assert!(released.get());
    }

    // ── pausing ───────────────────────────────────────────────────────────

    #[test]
    fn pause_suspends_delivery_and_resume_jumps_forward() {
        let link = rig(0.0);
        let rec = Recorder::default();
        let anim = FrameAnimator::animate(link.clone(), 1.0, rec.update());
        let id = anim.subscription().expect("running animation is subscribed");

        link.dispatch_at(DEFAULT, 0.2);

        anim.set_paused(true);
        assert!(anim.paused());
        assert_eq!(anim.state(), AnimatorState::Paused);
        assert_eq!(link.is_paused(id), Some(true));

        assert_eq!(link.dispatch_at(DEFAULT, 0.5), 0);
        assert_eq!(link.dispatch_at(DEFAULT, 0.8), 0);
        assert_eq!(rec.values(), vec![0.0, 0.2]);

        anim.set_paused(false);
        assert!(!anim.paused());
        assert_eq!(link.is_paused(id), Some(false));

        link.dispatch_at(DEFAULT, 0.9);
        assert_eq!(rec.values(), vec![0.0, 0.2, 0.9]);
    }

    #[test]
    fn pausing_a_later_animation_mid_frame_skips_its_tick() {
        let link = rig(0.0);
        let later: Rc<RefCell<Option<FrameAnimator>>> = Rc::default();

        let l = Rc::clone(&later);
        let first = FrameAnimator::animate(link.clone(), 1.0, move |p| {
            if p > 0.0 {
                if let Some(b) = l.borrow().as_ref() {
                    b.set_paused(true);
                }
            }
        });

        let rec = Recorder::default();
        let second = FrameAnimator::animate(link.clone(), 1.0, rec.update());
        *later.borrow_mut() = Some(second.clone());

        // Subscribed first, so `first` runs before `second` within a dispatch.
        assert!(first.subscription() < second.subscription());

        assert_eq!(link.dispatch_at(DEFAULT, 0.5), 1);
        assert_eq!(first.last_progress(), 0.5);
        assert_eq!(rec.values(), vec![0.0]);
        assert_eq!(second.state(), AnimatorState::Paused);

        first.cancel();
        second.cancel();
    }

    #[test]
    fn pause_toggles_are_ignored_after_finish() {
        let link = rig(0.0);
        let anim = FrameAnimator::animate(link.clone(), 1.0, |_| {});
        anim.cancel();

        anim.set_paused(true);
        assert!(!anim.paused());
        assert_eq!(anim.state(), AnimatorState::Cancelled);
    }

    #[test]
    fn cancel_while_paused() {
        let link = rig(0.0);
        let rec = Recorder::default();
        let anim =
            FrameAnimator::animate_with_completion(link.clone(), 1.0, rec.update(), rec.completion());

        anim.set_paused(true);
        anim.cancel();
        anim.set_paused(false);
        link.dispatch_at(DEFAULT, 2.0);

        assert_eq!(rec.values(), vec![0.0]);
        assert_eq!(rec.completions(), 0);
        assert_eq!(anim.state(), AnimatorState::Cancelled);
        assert!(link.is_empty());
    }

    // ── scheduling contexts ───────────────────────────────────────────────

    #[test]
    fn ticks_under_other_contexts_are_ignored() {
        let link = rig(0.0);
        let rec = Recorder::default();
        let _anim = FrameAnimator::animate(link.clone(), 1.0, rec.update());

        assert_eq!(link.dispatch_at(TRACKING, 0.5), 0);
        assert_eq!(rec.values(), vec![0.0]);
    }

    #[test]
    fn several_contexts_share_one_subscription() {
        let link = rig(0.0);
        let rec = Recorder::default();
        let anim = FrameAnimator::animate_with_options(
            link.clone(),
            1.0,
            rec.update(),
            None,
            SchedulingContext::common(),
        );

        assert_eq!(link.len(), 1);
        assert_eq!(anim.contexts(), &SchedulingContext::common());

        link.dispatch_at(DEFAULT, 0.25);
        link.dispatch_at(TRACKING, 0.5);
        assert_eq!(rec.values(), vec![0.0, 0.25, 0.5]);
    }

    #[test]
    fn empty_context_set_never_ticks() {
        let link = rig(0.0);
        let rec = Recorder::default();
        let anim = FrameAnimator::animate_with_options(
            link.clone(),
            1.0,
            rec.update(),
            Some(rec.completion()),
            Vec::new(),
        );

        link.dispatch_at(DEFAULT, 5.0);
        link.dispatch_at(TRACKING, 5.0);
        assert_eq!(rec.values(), vec![0.0]);
        assert_eq!(anim.state(), AnimatorState::Running);

        anim.cancel();
        assert!(link.is_empty());
    }

    #[test]
    fn factories_accept_trait_object_driver() {
        let driver: Rc<dyn FrameDriver> = rig(0.0);
        let rec = Recorder::default();
        let anim = FrameAnimator::animate_with_options(
            Rc::clone(&driver),
            1.0,
            rec.update(),
            Some(rec.completion()),
            [TRACKING],
        );

        assert_eq!(anim.start_time(), driver.now());
        assert_eq!(anim.contexts(), &[TRACKING]);
        anim.cancel();
        assert_eq!(rec.completions(), 0);
    }

    #[test]
    fn dropped_driver_leaves_animator_inert() {
        let link = rig(0.0);
        let anim = FrameAnimator::animate(link.clone(), 1.0, |_| {});
        drop(link);

        anim.set_paused(true);
        anim.cancel();
        assert_eq!(anim.state(), AnimatorState::Cancelled);
    }
}
