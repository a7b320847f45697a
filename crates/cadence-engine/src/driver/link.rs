use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::time::{Clock, FrameClock, MonotonicClock};

use super::context::SchedulingContext;
use super::tick::{FrameTick, SubscriptionId};
use super::{FrameDriver, TickHandler};

type SharedHandler = Rc<RefCell<TickHandler>>;

struct Entry {
    handler: SharedHandler,
    paused: bool,
    contexts: Vec<SchedulingContext>,
}

impl Entry {
    fn accepts(&self, context: SchedulingContext) -> bool {
        !self.paused && self.contexts.contains(&context)
    }
}

/// In-process frame driver.
///
/// `FrameLink` keeps the subscription table and fans one tick out to every
/// live subscription attached to the dispatched context. Whatever owns the
/// refresh signal (the winit runtime, a fixed-rate loop, a test) calls
/// [`dispatch`](Self::dispatch) once per frame.
///
/// Handlers may subscribe, unsubscribe, pause or attach while a dispatch is
/// in progress:
/// - a subscription removed or paused mid-dispatch is skipped for the rest of it
/// - a subscription added mid-dispatch is first invoked on the next dispatch
pub struct FrameLink<C: Clock = MonotonicClock> {
    clock: RefCell<FrameClock<C>>,
    entries: RefCell<BTreeMap<SubscriptionId, Entry>>,
    next_id: Cell<u64>,
}

impl FrameLink<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl Default for FrameLink<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FrameLink<C> {
    pub fn with_clock(clock: C) -> Self {
        Self::with_frame_clock(FrameClock::with_source(clock))
    }

    /// Uses a preconfigured frame clock (custom dt clamps).
    pub fn with_frame_clock(clock: FrameClock<C>) -> Self {
        Self {
            clock: RefCell::new(clock),
            entries: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(1),
        }
    }

    /// Copy of the time source, for loops that stamp frames themselves.
    pub fn source_clock(&self) -> C
    where
        C: Clone,
    {
        self.clock.borrow().source().clone()
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.entries.borrow().contains_key(&id)
    }

    /// Returns `None` for unknown subscriptions.
    pub fn is_paused(&self, id: SubscriptionId) -> Option<bool> {
        self.entries.borrow().get(&id).map(|e| e.paused)
    }

    /// Delivers one tick at the clock's current time.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, context: SchedulingContext) -> usize {
        let now = self.clock.borrow().now();
        self.dispatch_at(context, now)
    }

    /// Delivers one tick stamped with `timestamp`.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch_at(&self, context: SchedulingContext, timestamp: f64) -> usize {
        let ft = self.clock.borrow_mut().tick_at(timestamp);
        let tick = FrameTick {
            timestamp: ft.now,
            target_timestamp: ft.now + f64::from(ft.dt),
            context,
            frame_index: ft.frame_index,
        };

        // Snapshot so handlers can mutate the table while we iterate.
        let batch: Vec<(SubscriptionId, SharedHandler)> = self
            .entries
            .borrow()
            .iter()
            .filter(|(_, e)| e.accepts(context))
            .map(|(id, e)| (*id, Rc::clone(&e.handler)))
            .collect();

        let mut invoked = 0;
        for (id, handler) in batch {
            let still_live = self
                .entries
                .borrow()
                .get(&id)
                .is_some_and(|e| e.accepts(context));
            if !still_live {
                continue;
            }

            let Ok(mut handler) = handler.try_borrow_mut() else {
                log::warn!("{id} is already running; nested dispatch skipped it");
                continue;
            };
            (*handler)(&tick);
            invoked += 1;
        }

        invoked
    }
}

impl<C: Clock> FrameDriver for FrameLink<C> {
    fn now(&self) -> f64 {
        self.clock.borrow().now()
    }

    fn subscribe(&self, handler: TickHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        self.entries.borrow_mut().insert(
            id,
            Entry {
                handler: Rc::new(RefCell::new(handler)),
                paused: false,
                contexts: Vec::new(),
            },
        );

        log::debug!("frame link: subscribed {id}");
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        // Drop the handler outside the table borrow; it may own the last
        // reference to state whose teardown touches this link.
        let removed = self.entries.borrow_mut().remove(&id);
        if removed.is_some() {
            log::debug!("frame link: unsubscribed {id}");
        }
        drop(removed);
    }

    fn set_paused(&self, id: SubscriptionId, paused: bool) {
        if let Some(entry) = self.entries.borrow_mut().get_mut(&id) {
            entry.paused = paused;
        }
    }

    fn attach(&self, id: SubscriptionId, context: SchedulingContext) {
        if let Some(entry) = self.entries.borrow_mut().get_mut(&id) {
            if !entry.contexts.contains(&context) {
                entry.contexts.push(context);
            }
        }
    }
}
