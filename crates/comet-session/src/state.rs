//! Lifecycle state and its observable watch.

use tokio::sync::watch;

/// Lifecycle of a [`SessionController`](crate::SessionController).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Nothing running. Initial and terminal state.
    #[default]
    Idle,
    /// Connect and runner start are in flight.
    Starting,
    /// Runner started and players registered.
    Running,
    /// Teardown in progress.
    ShuttingDown,
}

/// Observable lifecycle state backed by a [`watch`] channel.
///
/// Changes only through compare-and-set transitions, so two callers racing
/// on the same edge cannot both win it.
#[derive(Debug)]
pub struct LifecycleWatch {
    tx: watch::Sender<LifecycleState>,
}

impl Default for LifecycleWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleWatch {
    /// Create a watch in [`LifecycleState::Idle`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LifecycleState::Idle);
        Self { tx }
    }

    /// Current state without blocking.
    pub fn current(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// New subscriber receiving every subsequent transition.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// Move `from → to`. Returns `false` and changes nothing if the current
    /// state is not `from`.
    pub(crate) fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        self.transition_any(&[from], to).is_some()
    }

    /// Move to `to` from any state in `from`, returning the state left.
    pub(crate) fn transition_any(
        &self,
        from: &[LifecycleState],
        to: LifecycleState,
    ) -> Option<LifecycleState> {
        let mut left = None;
        self.tx.send_if_modified(|state| {
            if from.contains(state) {
                left = Some(*state);
                *state = to;
                true
            } else {
                false
            }
        });
        if let Some(prev) = left {
            tracing::debug!("lifecycle {prev:?} -> {to:?}");
        }
        left
    }
}
