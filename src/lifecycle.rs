//! Mutation lifecycle shared by EEPROM spoofing and file patching.
//!
//! ```text
//! Idle -> BackingUp -> BackedUp -> Mutating -> Verifying -> Committed
//!             |                       |            |
//!             v                       v            v
//!           Failed                  Failed     RolledBack
//! ```
//!
//! `RolledBack` means the read-back did not match and the caller must
//! restore explicitly from the backup; nothing is restored automatically.

use crate::error::{Error, Result};

/// A state of a single mutation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    Idle,
    BackingUp,
    BackedUp,
    Mutating,
    Verifying,
    Committed,
    RolledBack,
    Failed,
}

impl MutationState {
    /// Whether no further transition is possible.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: MutationState) -> bool {
        use MutationState::*;
        matches!(
            (self, next),
            (Idle, BackingUp)
                | (BackingUp, BackedUp)
                | (BackingUp, Failed)
                | (BackedUp, Mutating)
                | (Mutating, Verifying)
                | (Mutating, Failed)
                | (Verifying, Committed)
                | (Verifying, RolledBack)
                | (Verifying, Failed)
        )
    }
}

/// Tracks one mutation attempt through [`MutationState`].
#[derive(Debug, Clone)]
pub struct Lifecycle {
    target: String,
    state: MutationState,
}

impl Lifecycle {
    /// Start a new attempt on `target` in [`MutationState::Idle`].
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: MutationState::Idle,
        }
    }

    /// The current state.
    pub fn state(&self) -> MutationState {
        self.state
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn advance(&mut self, next: MutationState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::Validation(format!(
                "illegal lifecycle transition {:?} -> {:?} for {}",
                self.state, next, self.target
            )));
        }
        log::debug!("{}: {:?} -> {:?}", self.target, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Move to [`MutationState::Failed`] from any non-terminal state past `Idle`.
    pub(crate) fn fail(&mut self) {
        if self.state.can_advance_to(MutationState::Failed) {
            log::debug!("{}: {:?} -> Failed", self.target, self.state);
            self.state = MutationState::Failed;
        }
    }
}
