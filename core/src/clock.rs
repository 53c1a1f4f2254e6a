//! Simulation clock — owns the iteration counter and pause state.

use crate::types::{Iteration, RunId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub run_id: RunId,
    pub current_iteration: Iteration,
    pub paused: bool,
}

impl SimClock {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            current_iteration: 0,
            paused: true,
        }
    }

    /// Advance one iteration. Returns the new iteration number.
    /// Panics if called while paused — callers must check.
    pub fn advance(&mut self) -> Iteration {
        assert!(!self.paused, "advance() called on paused clock");
        self.current_iteration += 1;
        self.current_iteration
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }
}
