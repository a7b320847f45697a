/// Lifecycle state of a `FrameAnimator`.
///
/// `Running ⇄ Paused` via the paused setter; `Completed` and `Cancelled`
/// are terminal.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AnimatorState {
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl AnimatorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AnimatorState::Completed | AnimatorState::Cancelled)
    }

    pub fn is_paused(self) -> bool {
        self == AnimatorState::Paused
    }
}
