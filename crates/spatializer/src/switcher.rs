//! The crossfading convolution switcher.
//!
//! Replacing a convolution's impulse mid-stream is a discontinuity in the filter and clicks.  Instead each source owns
//! two convolution slots.  On every update the new impulses go into whichever slot is currently inaudible (the
//! standby), which then fades in while the other fades out; the roles then swap, so the slot written next is always
//! the one that just faded out.
//!
//! Only the high band is convolved.  A crossover sends everything below its cutoff straight to the output.
//!
//! ```text
//! input -> gain -> crossover --low-------------------------------------+-> * distance gain -> L/R
//!                           \--high-> slot 0 (L, R) * ramp 0 --+       |
//!                            \------> slot 1 (L, R) * ramp 1 --+-------/
//! ```
use spatializer_dsp::{frames_for, Crossover, FirConvolver, GainRamp, SampleClock, SampleTimestamp};

use crate::config::EngineConfig;
use crate::grid::HrirPair;

/// Gain for a source at `distance`: `1 / (1 + distance^2)`.
pub fn distance_attenuation(distance: f64) -> f64 {
    1.0 / (1.0 + distance * distance)
}

/// One of the two convolution paths.
#[derive(Debug)]
struct ConvolutionSlot {
    left: FirConvolver,
    right: FirConvolver,
    gain: GainRamp,
    impulses: Option<HrirPair>,
}

impl ConvolutionSlot {
    fn new(gain: f64) -> ConvolutionSlot {
        ConvolutionSlot {
            left: FirConvolver::new(),
            right: FirConvolver::new(),
            gain: GainRamp::constant(gain),
            impulses: None,
        }
    }

    fn load(&mut self, pair: HrirPair) {
        self.left.set_impulse(pair.left.as_slice());
        self.right.set_impulse(pair.right.as_slice());
        self.impulses = Some(pair);
    }
}

/// Per-block buffers, kept around so that rendering doesn't allocate once they are big enough.
#[derive(Debug, Default)]
struct Scratch {
    low: Vec<f64>,
    high: Vec<f32>,
    conv_left: Vec<f32>,
    conv_right: Vec<f32>,
    mix_left: Vec<f64>,
    mix_right: Vec<f64>,
}

impl Scratch {
    fn resize(&mut self, frames: usize) {
        self.low.resize(frames, 0.0);
        self.high.resize(frames, 0.0);
        self.conv_left.resize(frames, 0.0);
        self.conv_right.resize(frames, 0.0);
        self.mix_left.resize(frames, 0.0);
        self.mix_right.resize(frames, 0.0);
    }
}

#[derive(Debug)]
pub struct ConvolutionSwitcher {
    slots: [ConvolutionSlot; 2],

    /// Index into `slots` of the slot most recently faded in.
    active: usize,

    crossover: Crossover,
    transition_frames: u64,
    input_gain: f64,
    output_gain: f64,
    clock: SampleClock,
    scratch: Scratch,
}

impl ConvolutionSwitcher {
    /// A switcher with both slots empty.
    ///
    /// Until the first [ConvolutionSwitcher::switch_to] only the low band is heard.
    pub fn new(config: &EngineConfig) -> ConvolutionSwitcher {
        ConvolutionSwitcher {
            slots: [ConvolutionSlot::new(1.0), ConvolutionSlot::new(0.0)],
            active: 0,
            crossover: Crossover::new(config.crossover_frequency),
            transition_frames: frames_for(config.transition_duration),
            input_gain: config.input_gain,
            output_gain: 1.0,
            clock: SampleClock::new(),
            scratch: Default::default(),
        }
    }

    /// Crossfade to `pair`, and set the distance gain for `distance`.
    ///
    /// The fade starts at the current time and lasts the configured transition.  The standby slot always fades in from
    /// zero and the active slot out from one.  If a previous fade is still running it is replaced, so a new impulse is
    /// never loaded into a slot that can be heard at that moment.
    pub fn switch_to(&mut self, pair: HrirPair, distance: f64) {
        let now = self.clock.now();
        let standby = self.active ^ 1;

        self.slots[standby].load(pair);
        self.slots[standby]
            .gain
            .schedule_linear(now, 0.0, 1.0, self.transition_frames);
        self.slots[self.active]
            .gain
            .schedule_linear(now, 1.0, 0.0, self.transition_frames);

        self.active = standby;
        self.output_gain = distance_attenuation(distance);
    }

    /// Spatialize a block of mono `input` into interleaved stereo `output`.
    ///
    /// # Panics
    ///
    /// If `output` is not exactly twice as long as `input`.
    pub fn render(&mut self, input: &[f32], output: &mut [f32]) {
        assert_eq!(
            output.len(),
            input.len() * 2,
            "Output must be interleaved stereo of the same length as the input"
        );

        let frames = input.len();
        if frames == 0 {
            return;
        }

        let start = self.clock.now();
        let scratch = &mut self.scratch;
        scratch.resize(frames);

        for (i, x) in input.iter().enumerate() {
            let (low, high) = self.crossover.split(*x as f64 * self.input_gain);
            scratch.low[i] = low;
            scratch.high[i] = high as f32;
        }

        scratch.mix_left.fill(0.0);
        scratch.mix_right.fill(0.0);

        for slot in self.slots.iter_mut() {
            if slot.gain.is_silent_over(start, frames as u64) {
                slot.left.skip(&scratch.high[..]);
                slot.right.skip(&scratch.high[..]);
                continue;
            }

            slot.left.process(&scratch.high[..], &mut scratch.conv_left[..]);
            slot.right.process(&scratch.high[..], &mut scratch.conv_right[..]);

            for i in 0..frames {
                let gain = slot.gain.value_at(start.offset(i as u64));
                scratch.mix_left[i] += gain * scratch.conv_left[i] as f64;
                scratch.mix_right[i] += gain * scratch.conv_right[i] as f64;
            }
        }

        for (i, frame) in output.chunks_exact_mut(2).enumerate() {
            let low = scratch.low[i];
            frame[0] = ((low + scratch.mix_left[i]) * self.output_gain) as f32;
            frame[1] = ((low + scratch.mix_right[i]) * self.output_gain) as f32;
        }

        self.clock.advance(frames as u64);
    }

    /// The time the next rendered frame will have.
    pub fn now(&self) -> SampleTimestamp {
        self.clock.now()
    }

    /// Index of the slot most recently switched to.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Gains of slot 0 and slot 1 at `time`.
    pub fn slot_gains_at(&self, time: SampleTimestamp) -> [f64; 2] {
        [
            self.slots[0].gain.value_at(time),
            self.slots[1].gain.value_at(time),
        ]
    }

    pub fn distance_gain(&self) -> f64 {
        self.output_gain
    }

    /// The impulses in the active slot, if any update has happened yet.
    pub fn active_impulses(&self) -> Option<&HrirPair> {
        self.slots[self.active].impulses.as_ref()
    }
}
