//! Desired/applied state machine
//!
//! [`ReconcileState`] holds the three values that must always be read and
//! written together: the desired state, the applied state and the debounce
//! window flag. It is only ever reached through the reconciler's mutex, so
//! `reconcile` can only run with the lock held.

use std::fmt;

use crate::actuator::{Actuator, ActuatorError};

/// What we believe the remote switch is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppliedState {
    /// Never confirmed, last attempt failed, or an attempt is in flight
    #[default]
    Unknown,
    On,
    Off,
}

impl AppliedState {
    pub fn from_desired(on: bool) -> Self {
        if on {
            AppliedState::On
        } else {
            AppliedState::Off
        }
    }

    /// Whether the switch is known to be in the `desired` state
    ///
    /// `Unknown` never matches.
    pub fn matches(self, desired: bool) -> bool {
        matches!(
            (self, desired),
            (AppliedState::On, true) | (AppliedState::Off, false)
        )
    }
}

impl fmt::Display for AppliedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppliedState::Unknown => f.write_str("unknown"),
            AppliedState::On => f.write_str("on"),
            AppliedState::Off => f.write_str("off"),
        }
    }
}

/// Consistent copy of the reconciler's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub desired: bool,
    pub applied: AppliedState,
    pub window_open: bool,
    pub disposed: bool,
}

/// Result of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Applied already matched desired; the switch was not contacted
    InSync,
    /// The switch confirmed the new state
    Applied(AppliedState),
    /// The attempt failed; applied is now unknown
    Failed { desired: bool, error: ActuatorError },
}

#[derive(Debug, Default)]
pub(crate) struct ReconcileState {
    desired: bool,
    applied: AppliedState,
    window_open: bool,
    /// Incremented every time a window opens
    window_id: u64,
    disposed: bool,
}

impl ReconcileState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Record a new desired state
    ///
    /// Returns the id of the window when this observation opened a new one, in
    /// which case the caller must arm the cooldown and reconcile now.
    pub(crate) fn observe(&mut self, desired: bool) -> Option<u64> {
        self.desired = desired;
        if self.window_open {
            return None;
        }
        self.window_open = true;
        self.window_id += 1;
        Some(self.window_id)
    }

    /// Id of the open window, if any
    pub(crate) fn open_window(&self) -> Option<u64> {
        self.window_open.then_some(self.window_id)
    }

    pub(crate) fn close_window(&mut self) {
        self.window_open = false;
    }

    /// Enter the disposed state, wanting the switch off
    ///
    /// The applied state is forgotten so the final reconciliation always
    /// contacts the switch. Returns `false` if already disposed.
    pub(crate) fn shut_down(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.desired = false;
        self.window_open = false;
        self.applied = AppliedState::Unknown;
        true
    }

    /// Bring the switch in line with the desired state
    pub(crate) fn reconcile(&mut self, actuator: &dyn Actuator) -> Outcome {
        let desired = self.desired;
        if self.applied.matches(desired) {
            return Outcome::InSync;
        }

        // Mark unknown first: if the call fails or never returns, the next
        // opportunity must retry.
        self.applied = AppliedState::Unknown;
        match actuator.set_state(desired) {
            Ok(()) => {
                self.applied = AppliedState::from_desired(desired);
                Outcome::Applied(self.applied)
            }
            Err(error) => Outcome::Failed { desired, error },
        }
    }

    pub(crate) fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            desired: self.desired,
            applied: self.applied,
            window_open: self.window_open,
            disposed: self.disposed,
        }
    }
}
