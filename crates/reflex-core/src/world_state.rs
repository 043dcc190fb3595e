//! Per-frame context passed to every update

use crate::error::Error;
use crate::time::GameTime;

/// What an update can observe about the current frame
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    /// Clock at the start of the frame
    pub time: GameTime,
    /// Failures that were logged and skipped instead of aborting the frame
    faults: Vec<Error>,
}

impl WorldState {
    /// Create a world state at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world state for `time`
    pub fn at(time: GameTime) -> Self {
        Self {
            time,
            faults: Vec::new(),
        }
    }

    /// Get the frame number
    pub fn frame(&self) -> u64 {
        self.time.frame
    }

    /// Record a failure that did not stop the frame
    pub fn record_fault(&mut self, error: Error) {
        self.faults.push(error);
    }

    /// Get the recorded failures
    pub fn faults(&self) -> &[Error] {
        &self.faults
    }

    /// Take and clear the recorded failures
    pub fn take_faults(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.faults)
    }
}
