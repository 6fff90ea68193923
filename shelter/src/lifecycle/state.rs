use std::fmt;

use crate::error::LifecycleError;

/// Where a worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Constructed, install not started.
    Parsed,
    /// Precaching the manifest.
    Installing,
    /// Installed, waiting for the previous worker to let go.
    Waiting,
    /// Cleaning up older generations.
    Activating,
    /// Serving fetches.
    Active,
    /// Failed or replaced. Terminal.
    Redundant,
}

impl LifecycleState {
    /// Returns the state as a string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Waiting => "waiting",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        }
    }

    /// Computes the state reached by applying `event`.
    pub fn transition(self, event: LifecycleEvent) -> Result<LifecycleState, LifecycleError> {
        use LifecycleEvent as E;
        use LifecycleState as S;

        match (self, event) {
            (S::Parsed, E::Install) => Ok(S::Installing),
            (S::Installing, E::InstallSucceeded) => Ok(S::Waiting),
            (S::Installing, E::InstallFailed) => Ok(S::Redundant),
            (S::Waiting, E::Activate) => Ok(S::Activating),
            (S::Activating, E::ActivateSucceeded) => Ok(S::Active),
            (S::Activating, E::ActivateFailed) => Ok(S::Redundant),
            (S::Waiting | S::Active, E::Replace) => Ok(S::Redundant),
            (from, event) => Err(LifecycleError::InvalidTransition { from, event }),
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input driving a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Install started.
    Install,
    /// Every manifest entry was stored.
    InstallSucceeded,
    /// Precaching failed.
    InstallFailed,
    /// Activation started.
    Activate,
    /// Older generations were removed.
    ActivateSucceeded,
    /// Cleanup failed.
    ActivateFailed,
    /// A newer worker took this one's place.
    Replace,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundant_is_terminal() {
        for event in [
            LifecycleEvent::Install,
            LifecycleEvent::InstallSucceeded,
            LifecycleEvent::InstallFailed,
            LifecycleEvent::Activate,
            LifecycleEvent::ActivateSucceeded,
            LifecycleEvent::ActivateFailed,
            LifecycleEvent::Replace,
        ] {
            assert!(LifecycleState::Redundant.transition(event).is_err());
        }
    }

    #[test]
    fn failures_are_redundant() {
        assert_eq!(
            LifecycleState::Installing.transition(LifecycleEvent::InstallFailed),
            Ok(LifecycleState::Redundant)
        );
        assert_eq!(
            LifecycleState::Activating.transition(LifecycleEvent::ActivateFailed),
            Ok(LifecycleState::Redundant)
        );
    }

    #[test]
    fn installing_cannot_be_replaced() {
        assert!(
            LifecycleState::Installing
                .transition(LifecycleEvent::Replace)
                .is_err()
        );
    }
}
