//! Offline phase reconstruction of impulse responses.
//!
//! Both functions keep the magnitude response of an impulse and replace its phase: [minimum_phase] with the unique
//! minimum-phase response of that magnitude, [linear_phase] with a pure delay of half the impulse length.  Either is
//! a batch operation meant for dataset preparation; nothing on the audio path calls it.
//!
//! The FFT size is at least 8 times the impulse length.  Minimum phase reconstruction folds the real cepstrum, and the
//! cepstrum of a measured HRIR is infinitely long, so the extra length is what keeps the time aliasing negligible.
use std::f64::consts::PI;

use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

const OVERSAMPLE: usize = 8;

/// Magnitudes below this fraction of the peak are raised to it before taking logs.
const LOG_FLOOR: f64 = 1e-10;

struct Plan {
    len: usize,
    forward: std::sync::Arc<dyn Fft<f64>>,
    inverse: std::sync::Arc<dyn Fft<f64>>,
}

impl Plan {
    fn new(impulse_len: usize) -> Plan {
        let len = (impulse_len * OVERSAMPLE).next_power_of_two();
        let mut planner = FftPlanner::new();
        Plan {
            len,
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
        }
    }

    fn spectrum(&self, impulse: &[f32]) -> Vec<Complex64> {
        let mut buf = vec![Complex64::new(0.0, 0.0); self.len];
        for (dst, src) in buf.iter_mut().zip(impulse.iter()) {
            *dst = Complex64::new(*src as f64, 0.0);
        }
        self.forward.process(&mut buf);
        buf
    }

    /// Inverse transform, normalize, and keep the first `keep` real samples.
    fn to_impulse(&self, mut spectrum: Vec<Complex64>, keep: usize) -> Vec<f32> {
        self.inverse.process(&mut spectrum);
        let scale = 1.0 / self.len as f64;
        spectrum
            .iter()
            .take(keep)
            .map(|c| (c.re * scale) as f32)
            .collect()
    }
}

/// Compute the minimum-phase impulse with the same magnitude response as `impulse`, truncated to the same length.
pub fn minimum_phase(impulse: &[f32]) -> Vec<f32> {
    if impulse.is_empty() {
        return vec![];
    }

    let plan = Plan::new(impulse.len());
    let n = plan.len;
    let spectrum = plan.spectrum(impulse);

    let peak = spectrum.iter().map(|c| c.norm()).fold(0.0, f64::max);
    if peak == 0.0 {
        return vec![0.0; impulse.len()];
    }
    let floor = peak * LOG_FLOOR;

    let mut cepstrum = spectrum
        .iter()
        .map(|c| Complex64::new(c.norm().max(floor).ln(), 0.0))
        .collect::<Vec<_>>();
    plan.inverse.process(&mut cepstrum);

    // Fold the real cepstrum onto positive quefrencies.  The 1/n normalization of the inverse is folded in here too.
    let half = n / 2;
    for (i, c) in cepstrum.iter_mut().enumerate() {
        let weight = match i {
            0 => 1.0,
            i if i == half => 1.0,
            i if i < half => 2.0,
            _ => 0.0,
        };
        *c = Complex64::new(c.re * weight / n as f64, 0.0);
    }

    plan.forward.process(&mut cepstrum);
    let min_phase = cepstrum.into_iter().map(|c| c.exp()).collect();
    plan.to_impulse(min_phase, impulse.len())
}

/// Compute the linear-phase impulse with the same magnitude response as `impulse`.
///
/// The result is symmetric about `impulse.len() / 2` and truncated to the input's length.
pub fn linear_phase(impulse: &[f32]) -> Vec<f32> {
    if impulse.is_empty() {
        return vec![];
    }

    let plan = Plan::new(impulse.len());
    let n = plan.len as f64;
    let delay = (impulse.len() / 2) as f64;

    // The delay is a whole number of samples, so using `k` rather than the signed frequency for bins above nyquist
    // gives the same phase and the result stays real.
    let spectrum = plan
        .spectrum(impulse)
        .iter()
        .enumerate()
        .map(|(k, c)| Complex64::from_polar(c.norm(), -2.0 * PI * k as f64 * delay / n))
        .collect();
    plan.to_impulse(spectrum, impulse.len())
}
