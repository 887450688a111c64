//! Generation-cycle state machine with thread-safe transitions.
//!
//! Enforces valid state transitions for one answer cycle:
//! - Idle -> Streaming (cycle starts)
//! - Streaming -> Committing (stream ended, persisting the exchange)
//! - Committing -> Idle (exchange persisted, cycle complete)
//! - Streaming -> Failed (stream or service error)
//! - Committing -> Failed (persistence error)
//! - Failed -> Idle (error surfaced, ready for resubmission)
//!
//! A second cycle may not start until the machine is back at Idle; the
//! machine itself is the re-entrancy guard.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::ChatError;

/// State of the in-flight answer cycle for one chat view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleState {
    /// No cycle in progress. Ready to accept a submission.
    Idle,
    /// Accumulating answer chunks from the generation service.
    Streaming,
    /// Stream complete, persisting the exchange as one append.
    Committing,
    /// The cycle failed; the partial answer was discarded.
    Failed,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleState::Idle => write!(f, "Idle"),
            CycleState::Streaming => write!(f, "Streaming"),
            CycleState::Committing => write!(f, "Committing"),
            CycleState::Failed => write!(f, "Failed"),
        }
    }
}

impl CycleState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &CycleState) -> bool {
        matches!(
            (self, target),
            (CycleState::Idle, CycleState::Streaming)
                | (CycleState::Streaming, CycleState::Committing)
                | (CycleState::Committing, CycleState::Idle)
                // Error transitions
                | (CycleState::Streaming, CycleState::Failed)
                | (CycleState::Committing, CycleState::Failed)
                | (CycleState::Failed, CycleState::Idle)
        )
    }
}

/// Thread-safe state machine for the answer cycle.
///
/// Wraps `CycleState` in an `Arc<Mutex<>>` so clones observe the same
/// state. All transitions are validated before being applied.
#[derive(Debug, Clone)]
pub struct CycleMachine {
    state: Arc<Mutex<CycleState>>,
}

impl Default for CycleMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CycleState::Idle)),
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> CycleState {
        *self.state.lock().expect("state mutex poisoned")
    }

    /// Start a cycle: atomically move to Streaming.
    ///
    /// Allowed from Idle and from Failed (a resubmission after an error
    /// acknowledges the failure). Returns `ChatError::CycleBusy` while a
    /// cycle is in flight, so a second stream can never start over a
    /// running one.
    pub fn begin(&self) -> Result<(), ChatError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        match *state {
            CycleState::Idle | CycleState::Failed => {
                tracing::debug!("Cycle state: {} -> {}", *state, CycleState::Streaming);
                *state = CycleState::Streaming;
                Ok(())
            }
            current => Err(ChatError::CycleBusy(current)),
        }
    }

    /// Attempt to transition to the target state.
    ///
    /// Returns `Ok(())` if the transition is valid, or
    /// `ChatError::InvalidTransition` if it is not allowed from the
    /// current state.
    pub fn transition(&self, target: CycleState) -> Result<(), ChatError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if state.can_transition_to(&target) {
            tracing::debug!("Cycle state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(ChatError::InvalidTransition {
                from: *state,
                to: target,
            })
        }
    }

    /// Force the state machine back to Idle (used for error recovery).
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("state mutex poisoned");
        tracing::warn!("Cycle state machine reset to Idle from {}", *state);
        *state = CycleState::Idle;
    }
}

// =============================================================================
// Tests
// =============================================================================
