//! Worker lifecycle.
//!
//! A worker moves through `Parsed → Installing → Waiting → Activating →
//! Active`, dropping to `Redundant` when install or activation fails or a
//! newer worker replaces it. The table of legal moves lives in [`state`];
//! [`Lifecycle`] holds the current state and lets observers follow it.

mod state;

pub use state::{LifecycleEvent, LifecycleState};

use tokio::sync::watch;
use tracing::debug;

use crate::error::LifecycleError;

/// Current lifecycle state of one worker.
#[derive(Debug)]
pub struct Lifecycle {
    tx: watch::Sender<LifecycleState>,
}

impl Lifecycle {
    /// Starts in [`LifecycleState::Parsed`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LifecycleState::Parsed);
        Self { tx }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Applies `event`, notifying subscribers on success.
    ///
    /// An illegal move leaves the state untouched.
    pub fn apply(&self, event: LifecycleEvent) -> Result<LifecycleState, LifecycleError> {
        let mut outcome = Err(LifecycleError::InvalidTransition {
            from: self.state(),
            event,
        });
        self.tx.send_if_modified(|state| match state.transition(event) {
            Ok(next) => {
                debug!(from = %state, to = %next, ?event, "lifecycle transition");
                *state = next;
                outcome = Ok(next);
                true
            }
            Err(err) => {
                outcome = Err(err);
                false
            }
        });
        outcome
    }

    /// Receiver observing every state change.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
