use super::types::FormErrorCause;
use crate::tracker::{Region, SyncTracker};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Position of the repetition cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepState {
    /// Start of a set, or after a reset: waiting for both arms to go down
    WaitingToRaise,
    /// Both arms are below the red line; a synchronized raise counts a rep
    ArmsLowered,
    /// A rep was counted; the arms have to come down before the next one
    WaitingToLower,
}

impl RepState {
    pub fn label(&self) -> &'static str {
        match self {
            RepState::WaitingToRaise => "waiting_to_raise",
            RepState::ArmsLowered => "arms_lowered",
            RepState::WaitingToLower => "waiting_to_lower",
        }
    }
}

/// Outcome of evaluating one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Entered `ArmsLowered`
    Lowered,
    /// A synchronized raise from `ArmsLowered`
    RepCompleted,
    /// A form error was counted for this cycle
    FormError(FormErrorCause),
}

/// Repetition state machine.
///
/// Counters live with the session controller; the machine only decides which
/// transition a pair of regions triggers.
#[derive(Debug, Clone)]
pub struct RepetitionMachine {
    state: RepState,
    error_already_counted: bool,
    /// Set by a counted rep while both arms stay above the green line
    holding_after_rep: bool,
}

impl RepetitionMachine {
    pub fn new() -> Self {
        Self {
            state: RepState::WaitingToRaise,
            error_already_counted: false,
            holding_after_rep: false,
        }
    }

    pub fn state(&self) -> RepState {
        self.state
    }

    pub fn error_already_counted(&self) -> bool {
        self.error_already_counted
    }

    pub fn reset(&mut self) {
        self.state = RepState::WaitingToRaise;
        self.error_already_counted = false;
        self.holding_after_rep = false;
    }

    /// Evaluate the regions of both elbows for the current frame.
    ///
    /// `sync` must already contain this frame's observations.
    pub fn evaluate(&mut self, left: Region, right: Region, sync: &SyncTracker) -> Option<Transition> {
        // The raise that completed a rep is over once either arm leaves the green zone
        if !(left == Region::AboveGreen && right == Region::AboveGreen) {
            self.holding_after_rep = false;
        }

        if left == right {
            self.evaluate_symmetric(left, sync)
        } else {
            self.evaluate_asymmetric(left, right, sync)
        }
    }

    fn evaluate_symmetric(&mut self, region: Region, sync: &SyncTracker) -> Option<Transition> {
        match (region, self.state) {
            (Region::BelowRed, RepState::WaitingToRaise | RepState::WaitingToLower) => {
                self.state = RepState::ArmsLowered;
                self.error_already_counted = false;
                Some(Transition::Lowered)
            }
            (Region::AboveGreen, RepState::ArmsLowered) => {
                if sync.synchronized(Region::AboveGreen) {
                    self.state = RepState::WaitingToLower;
                    self.error_already_counted = false;
                    self.holding_after_rep = true;
                    Some(Transition::RepCompleted)
                } else {
                    debug!("Both arms raised but entries were not synchronized");
                    None
                }
            }
            (Region::AboveGreen, RepState::WaitingToLower)
                if !self.error_already_counted && !self.holding_after_rep =>
            {
                let cause = if sync.synchronized(Region::AboveGreen) {
                    FormErrorCause::RaisedWithoutLowering
                } else {
                    FormErrorCause::Desynchronized
                };
                Some(self.count_error(cause))
            }
            _ => None,
        }
    }

    fn evaluate_asymmetric(&mut self, left: Region, right: Region, sync: &SyncTracker) -> Option<Transition> {
        if !(left.is_monitored() && right.is_monitored()) {
            return None;
        }

        // Each side sits in a different monitored region; judged on the left side's region
        if sync.synchronized(left) {
            return None;
        }

        if self.state == RepState::WaitingToLower && !self.error_already_counted {
            Some(self.count_error(FormErrorCause::Desynchronized))
        } else {
            None
        }
    }

    fn count_error(&mut self, cause: FormErrorCause) -> Transition {
        self.error_already_counted = true;
        Transition::FormError(cause)
    }
}

impl Default for RepetitionMachine {
    fn default() -> Self {
        Self::new()
    }
}
