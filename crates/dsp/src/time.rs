use std::time::Duration;

use crate::config::SR;

/// A clock, measuring time in frames at [SR].
///
/// Gain ramps are scheduled against this clock rather than wall time, so a transition always lasts the same number of
/// frames no matter how the caller's update timer drifts.
///
/// Clocks cannot go backward.
#[derive(Debug, Default, Clone)]
pub struct SampleClock {
    frame: u64,
}

/// A timestamp in frames.
#[derive(Copy, Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct SampleTimestamp {
    frame: u64,
}

impl SampleClock {
    /// Create a clock at time zero.
    pub fn new() -> SampleClock {
        SampleClock { frame: 0 }
    }

    /// Get the current time.
    pub fn now(&self) -> SampleTimestamp {
        SampleTimestamp { frame: self.frame }
    }

    /// Advance this clock by `frames` frames.
    pub fn advance(&mut self, frames: u64) {
        self.frame += frames;
    }
}

impl SampleTimestamp {
    pub fn from_frames(frame: u64) -> SampleTimestamp {
        SampleTimestamp { frame }
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// This timestamp moved forward by `frames`.
    pub fn offset(&self, frames: u64) -> SampleTimestamp {
        SampleTimestamp {
            frame: self.frame + frames,
        }
    }
}

/// Convert a duration to a whole number of frames at [SR], rounding to nearest.
pub fn frames_for(duration: Duration) -> u64 {
    (duration.as_secs_f64() * SR as f64).round() as u64
}
