//! Frame time
//!
//! - `GameTime` - total time since start, time since the last frame, frame count

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Game clock state read by actions and the event queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTime {
    /// Time since the clock started
    pub total: Duration,
    /// Length of the most recent frame
    pub elapsed: Duration,
    /// Number of frames advanced
    pub frame: u64,
}

impl GameTime {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock positioned at `total`
    pub fn at(total: Duration) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Create a clock positioned at `millis` milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self::at(Duration::from_millis(millis))
    }

    /// Advance one frame of length `step`
    pub fn advance(&mut self, step: Duration) {
        self.total += step;
        self.elapsed = step;
        self.frame += 1;
    }

    /// Move the clock to `total` without counting a frame
    pub fn set_total(&mut self, total: Duration) {
        self.total = total;
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {} at {}ms", self.frame, self.total.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_time_advance() {
        let mut time = GameTime::new();
        time.advance(Duration::from_millis(16));
        time.advance(Duration::from_millis(16));

        assert_eq!(time.total, Duration::from_millis(32));
        assert_eq!(time.elapsed, Duration::from_millis(16));
        assert_eq!(time.frame, 2);
        assert_eq!(time.to_string(), "frame 2 at 32ms");
    }

    #[test]
    fn test_game_time_serialization() {
        let time = GameTime::from_millis(250);
        let serialized = ron::to_string(&time).expect("serialize");
        let deserialized: GameTime = ron::from_str(&serialized).expect("deserialize");
        assert_eq!(deserialized, time);
    }
}
