/// Evaluate a convolution by directly evaluating the sum.
///
/// Complexity is `theta(M*N)` where `M` is the impulse length and `N` the output block's length.  For the 200-tap
/// impulses this crate deals in that beats any FFT-based approach at realistic block sizes.
///
/// The impulse must be reversed.  The input must start `M - 1` samples in the past and be `M - 1` frames longer than
/// the output.
///
/// This is designed for use in streaming contexts, and so only outputs a block of audio, not the trailing portion.
///
/// # Panics
///
/// Panics if any validation fails, as these are (or should be) programmer bugs.
pub fn convolve_direct(input: &[f32], output: &mut [f32], impulse: &[f32]) {
    assert!(!impulse.is_empty());
    assert_eq!(input.len(), output.len() + impulse.len() - 1);

    for (frame, out) in output.iter_mut().enumerate() {
        // f32 accumulation is fine for short impulses and measurably faster than f64.
        *out = input[frame..frame + impulse.len()]
            .iter()
            .zip(impulse.iter())
            .map(|(x, h)| x * h)
            .sum();
    }
}

/// A streaming FIR filter.
///
/// Holds the reversed impulse plus enough input history to continue the convolution seamlessly across blocks.  The
/// impulse may be replaced at any time, including by one of a different length; history survives the replacement, so
/// the new filter starts from the same input the old one had seen rather than from silence.
#[derive(Debug, Clone, Default)]
pub struct FirConvolver {
    reversed: Vec<f32>,

    /// Always exactly `history_len()` frames between calls; the current block is appended during processing.
    buffer: Vec<f32>,
}

impl FirConvolver {
    /// A convolver with no impulse, which outputs silence.
    pub fn new() -> FirConvolver {
        Default::default()
    }

    pub fn with_impulse(impulse: &[f32]) -> FirConvolver {
        let mut ret = FirConvolver::new();
        ret.set_impulse(impulse);
        ret
    }

    fn history_len(&self) -> usize {
        self.reversed.len().saturating_sub(1)
    }

    pub fn impulse_len(&self) -> usize {
        self.reversed.len()
    }

    /// Replace the impulse.
    pub fn set_impulse(&mut self, impulse: &[f32]) {
        let old_history = self.history_len();
        self.reversed.clear();
        self.reversed.extend(impulse.iter().rev().copied());
        let new_history = self.history_len();

        if new_history <= old_history {
            self.buffer.drain(..old_history - new_history);
        } else {
            // We never kept input this old, so it reads as silence.
            let pad = new_history - old_history;
            self.buffer.splice(0..0, std::iter::repeat(0.0).take(pad));
        }
        debug_assert_eq!(self.buffer.len(), new_history);
    }

    /// Filter `input` into `output`, which must be the same length.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        assert_eq!(input.len(), output.len());

        if self.reversed.is_empty() {
            output.fill(0.0);
            return;
        }

        self.buffer.extend_from_slice(input);
        convolve_direct(&self.buffer[..], output, &self.reversed[..]);
        self.buffer.drain(..input.len());
    }

    /// Advance over `input` without computing any output.
    ///
    /// Used for filters whose output is currently inaudible, so that they have the right history when they become
    /// audible again.
    pub fn skip(&mut self, input: &[f32]) {
        let history = self.history_len();
        if history == 0 {
            return;
        }

        self.buffer.extend_from_slice(input);
        let excess = self.buffer.len() - history;
        self.buffer.drain(..excess);
    }
}
