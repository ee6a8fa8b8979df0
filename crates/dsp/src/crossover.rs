//! A two-band crossover.
//!
//! Each band is a 4th order Linkwitz-Riley section, built by cascading two identical butterworth biquads.  The point
//! of Linkwitz-Riley over a single butterworth pair is that the two bands sum back to an allpass: with plain
//! butterworth sections the sum has a notch at the cutoff, which would punch a hole in the spectrum exactly where the
//! spatialized and bypassed bands meet.
use num::complex::Complex64;

use crate::biquad::*;

#[derive(Debug, Clone)]
pub struct Crossover {
    frequency: f64,
    low: [MonoBiquadFilter; 2],
    high: [MonoBiquadFilter; 2],
}

impl Crossover {
    /// Build a crossover at `frequency` hz.
    ///
    /// # Panics
    ///
    /// If the frequency is not in `(0, SR / 2)`.  Configuration validates this before it gets here.
    pub fn new(frequency: f64) -> Crossover {
        assert!(
            frequency > 0.0 && frequency < crate::SR as f64 / 2.0,
            "Crossover frequency {} is outside (0, nyquist)",
            frequency
        );

        let low = BiquadFilterDef::audio_eq_lowpass(frequency, DEFAULT_Q);
        let high = BiquadFilterDef::audio_eq_highpass(frequency, DEFAULT_Q);
        Crossover {
            frequency,
            low: [
                MonoBiquadFilter::new(low.clone()),
                MonoBiquadFilter::new(low),
            ],
            high: [
                MonoBiquadFilter::new(high.clone()),
                MonoBiquadFilter::new(high),
            ],
        }
    }

    /// Split one sample into `(low, high)`.
    pub fn split(&mut self, input: f64) -> (f64, f64) {
        let low = self.low[0].tick(input);
        let low = self.low[1].tick(low);
        let high = self.high[0].tick(input);
        let high = self.high[1].tick(high);
        (low, high)
    }

    /// The complex responses of the `(low, high)` bands at `frequency` hz.
    pub fn frequency_response(&self, frequency: f64) -> (Complex64, Complex64) {
        let low = BiquadFilterDef::audio_eq_lowpass(self.frequency, DEFAULT_Q)
            .frequency_response(frequency)
            .powu(2);
        let high = BiquadFilterDef::audio_eq_highpass(self.frequency, DEFAULT_Q)
            .frequency_response(frequency)
            .powu(2);
        (low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{close_floats::*, DbExt};

    #[test]
    fn test_bands_meet_at_minus_6db() {
        let xo = Crossover::new(200.0);
        let (low, high) = xo.frequency_response(200.0);
        close_floats64(low.norm().gain_to_db(), -6.02, 0.05);
        close_floats64(high.norm().gain_to_db(), -6.02, 0.05);
    }

    #[test]
    fn test_sum_is_flat() {
        let xo = Crossover::new(200.0);
        for freq in [20.0, 100.0, 200.0, 400.0, 1000.0, 10000.0] {
            let (low, high) = xo.frequency_response(freq);
            close_floats64((low + high).norm().gain_to_db(), 0.0, 0.01);
        }
    }

    #[test]
    fn test_split_separates_dc() {
        let mut xo = Crossover::new(200.0);
        let mut last = (0.0, 0.0);
        for _ in 0..crate::SR {
            last = xo.split(1.0);
        }
        close_floats64(last.0, 1.0, 1e-6);
        close_floats64(last.1, 0.0, 1e-6);
    }

    #[test]
    fn test_split_cascades_two_sections_per_band() {
        let mut xo = Crossover::new(1000.0);
        let lp = BiquadFilterDef::audio_eq_lowpass(1000.0, DEFAULT_Q);
        let hp = BiquadFilterDef::audio_eq_highpass(1000.0, DEFAULT_Q);
        let mut low = [MonoBiquadFilter::new(lp.clone()), MonoBiquadFilter::new(lp)];
        let mut high = [MonoBiquadFilter::new(hp.clone()), MonoBiquadFilter::new(hp)];

        for i in 0..512 {
            let x = ((i * 37) % 11) as f64 / 5.0 - 1.0;
            let first_low = low[0].tick(x);
            let first_high = high[0].tick(x);
            let (got_low, got_high) = xo.split(x);
            close_floats64(got_low, low[1].tick(first_low), 1e-12);
            close_floats64(got_high, high[1].tick(first_high), 1e-12);
        }
    }

    #[test]
    #[should_panic]
    fn test_rejects_frequency_above_nyquist() {
        Crossover::new(30000.0);
    }
}
