use std::fmt;

/// Category under which frame delivery is permitted.
///
/// A subscription only receives ticks dispatched under a context it has been
/// attached to. The runtime dispatches `Tracking` while the user is actively
/// interacting (a pointer button is held) and `Default` otherwise.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SchedulingContext {
    /// Standard delivery context.
    #[default]
    Default,
    /// Interactive event tracking (drags, scroll gestures).
    Tracking,
    /// Application-defined context.
    Named(&'static str),
}

impl SchedulingContext {
    /// Contexts that together cover ordinary and interactive delivery.
    pub const fn common() -> [SchedulingContext; 2] {
        [SchedulingContext::Default, SchedulingContext::Tracking]
    }
}

impl fmt::Display for SchedulingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingContext::Default => f.write_str("default"),
            SchedulingContext::Tracking => f.write_str("tracking"),
            SchedulingContext::Named(name) => f.write_str(name),
        }
    }
}
