use crate::time::SampleTimestamp;

/// A gain that can be scheduled to move linearly between two values.
///
/// This is the subset of automation the crossfade needs: at any time there is at most one segment, running from
/// `start` to `end`.  Before the segment starts the gain holds `from`, and from `end` on it holds `to`.  Scheduling a new
/// segment replaces the old one outright, even if the old one is still in flight.
///
/// Values are clamped to be non-negative when scheduled, so no schedule can produce a negative gain.
#[derive(Debug, Clone)]
pub struct GainRamp {
    from: f64,
    to: f64,
    start: SampleTimestamp,
    end: SampleTimestamp,
}

impl GainRamp {
    /// A ramp which holds `value` forever.
    pub fn constant(value: f64) -> GainRamp {
        let value = value.max(0.0);
        GainRamp {
            from: value,
            to: value,
            start: SampleTimestamp::default(),
            end: SampleTimestamp::default(),
        }
    }

    /// Move from `from` to `to` over `frames` frames starting at `start`.
    ///
    /// A zero-length ramp jumps straight to `to`.
    pub fn schedule_linear(&mut self, start: SampleTimestamp, from: f64, to: f64, frames: u64) {
        self.from = from.max(0.0);
        self.to = to.max(0.0);
        self.start = start;
        self.end = start.offset(frames);
    }

    /// The gain at `time`.
    pub fn value_at(&self, time: SampleTimestamp) -> f64 {
        if time >= self.end {
            return self.to;
        }
        if time <= self.start {
            return self.from;
        }

        // Only reachable when end > start, so the division is safe.
        let elapsed = (time.frames() - self.start.frames()) as f64;
        let length = (self.end.frames() - self.start.frames()) as f64;
        let t = elapsed / length;
        self.from + (self.to - self.from) * t
    }

    /// Is the gain exactly zero everywhere in `[from, from + frames)`?
    ///
    /// Lets consumers skip work that would only be multiplied by zero.
    pub fn is_silent_over(&self, from: SampleTimestamp, frames: u64) -> bool {
        let last = from.offset(frames.saturating_sub(1));
        if from >= self.end {
            return self.to == 0.0;
        }
        if last < self.start {
            return self.from == 0.0;
        }

        self.from == 0.0 && self.to == 0.0
    }
}
