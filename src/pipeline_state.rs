//! Pipeline State Machine
//!
//! Tracks the position of the runner in its ordered script list and enforces
//! the fail-fast contract: the pipeline only moves forward one script at a
//! time, and once it is `Completed` or `Halted` it never moves again.
//!
//! ```text
//! NotStarted
//!     ↓
//! Running { 0 } → Running { 1 } → ... → Running { n-1 }
//!     ↓                                      ↓
//! Halted { i }  (from any Running)        Completed
//! ```

use std::fmt;
use thiserror::Error;

/// Where the pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No script has been entered yet
    NotStarted,
    /// The script at `index` is being validated or executed
    Running { index: usize },
    /// Every script returned exit code 0 (terminal)
    Completed,
    /// A failure occurred; `index` is the step that failed (terminal)
    Halted { index: usize },
}

impl PipelineState {
    /// Returns true for `Completed` and `Halted`
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Halted { .. })
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Running { index } => write!(f, "running step {}", index + 1),
            Self::Completed => write!(f, "completed"),
            Self::Halted { index } => write!(f, "halted at step {}", index + 1),
        }
    }
}

/// Errors that can occur during state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot leave terminal state '{0}'")]
    Terminal(PipelineState),

    #[error("cannot enter step {requested} from '{from}'; steps must run in order")]
    OutOfOrder { from: PipelineState, requested: usize },

    #[error("step {requested} is past the end of a {total}-step pipeline")]
    OutOfRange { requested: usize, total: usize },

    #[error("cannot complete from '{0}'; not every step has run")]
    Incomplete(PipelineState),
}

/// Owns the pipeline state for one run.
#[derive(Debug)]
pub struct PipelineTracker {
    state: PipelineState,
    total: usize,
}

impl PipelineTracker {
    pub fn new(total: usize) -> Self {
        Self {
            state: PipelineState::NotStarted,
            total,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Move to `index`, which must be the step right after the current one.
    pub fn enter(&mut self, index: usize) -> Result<(), TransitionError> {
        let expected = match self.state {
            PipelineState::NotStarted => 0,
            PipelineState::Running { index: current } => current + 1,
            terminal => return Err(TransitionError::Terminal(terminal)),
        };
        if index >= self.total {
            return Err(TransitionError::OutOfRange {
                requested: index,
                total: self.total,
            });
        }
        if index != expected {
            return Err(TransitionError::OutOfOrder {
                from: self.state,
                requested: index,
            });
        }
        self.state = PipelineState::Running { index };
        Ok(())
    }

    /// Finish the run. Only valid while running the last step.
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        match self.state {
            PipelineState::Running { index } if index + 1 == self.total => {
                self.state = PipelineState::Completed;
                Ok(())
            }
            state if state.is_terminal() => Err(TransitionError::Terminal(state)),
            state => Err(TransitionError::Incomplete(state)),
        }
    }

    /// Stop the pipeline at the current step. Halting an already halted
    /// pipeline keeps the original failure position.
    pub fn halt(&mut self) {
        self.state = match self.state {
            PipelineState::NotStarted => PipelineState::Halted { index: 0 },
            PipelineState::Running { index } => PipelineState::Halted { index },
            terminal => terminal,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_progression_to_completed() {
        let mut tracker = PipelineTracker::new(3);
        for i in 0..3 {
            tracker.enter(i).unwrap();
            assert_eq!(tracker.state(), PipelineState::Running { index: i });
        }
        tracker.complete().unwrap();
        assert_eq!(tracker.state(), PipelineState::Completed);
    }

    #[test]
    fn test_cannot_skip_steps() {
        let mut tracker = PipelineTracker::new(3);
        tracker.enter(0).unwrap();
        let err = tracker.enter(2).unwrap_err();
        assert!(matches!(err, TransitionError::OutOfOrder { requested: 2, .. }));
    }

    #[test]
    fn test_cannot_complete_early() {
        let mut tracker = PipelineTracker::new(2);
        tracker.enter(0).unwrap();
        assert!(matches!(
            tracker.complete(),
            Err(TransitionError::Incomplete(_))
        ));
    }

    #[test]
    fn test_halted_is_terminal() {
        let mut tracker = PipelineTracker::new(3);
        tracker.enter(0).unwrap();
        tracker.enter(1).unwrap();
        tracker.halt();
        assert_eq!(tracker.state(), PipelineState::Halted { index: 1 });

        assert!(matches!(tracker.enter(2), Err(TransitionError::Terminal(_))));
        assert!(matches!(tracker.complete(), Err(TransitionError::Terminal(_))));

        tracker.halt();
        assert_eq!(tracker.state(), PipelineState::Halted { index: 1 });
    }

    #[test]
    fn test_out_of_range() {
        let mut tracker = PipelineTracker::new(1);
        tracker.enter(0).unwrap();
        assert!(matches!(
            tracker.enter(1),
            Err(TransitionError::OutOfRange { requested: 1, total: 1 })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(PipelineState::Running { index: 0 }.to_string(), "running step 1");
        assert_eq!(PipelineState::Halted { index: 2 }.to_string(), "halted at step 3");
    }
}
