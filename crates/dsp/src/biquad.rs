//! Second-order sections for the crossover, designed per the [Audio Eq Cookbook](https://www.w3.org/TR/audio-eq-cookbook/).
use std::f64::consts::PI;

use num::complex::Complex64;

use crate::config::SR;

/// The `Q` of a second-order butterworth section.
pub const DEFAULT_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Which half of the spectrum a section passes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Pass {
    Low,
    High,
}

/// Coefficients of `(b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadFilterDef {
    b: [f64; 3],
    a: [f64; 2],
}

/// One channel of a biquad, in transposed direct form 2.
#[derive(Debug, Clone)]
pub struct MonoBiquadFilter {
    def: BiquadFilterDef,
    state: [f64; 2],
}

impl BiquadFilterDef {
    /// Build from unnormalized coefficients, dividing everything through by `a[0]`.
    pub fn new_raw(b: [f64; 3], a: [f64; 3]) -> BiquadFilterDef {
        BiquadFilterDef {
            b: b.map(|x| x / a[0]),
            a: [a[1] / a[0], a[2] / a[0]],
        }
    }

    /// The cookbook lowpass or highpass at `frequency` hz.
    pub fn cookbook(pass: Pass, frequency: f64, q: f64) -> BiquadFilterDef {
        let omega = 2.0 * PI * frequency / SR as f64;
        let (sin, cos) = omega.sin_cos();
        let alpha = sin / (2.0 * q);

        let b = match pass {
            Pass::Low => [(1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0],
            Pass::High => [(1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0],
        };
        BiquadFilterDef::new_raw(b, [1.0 + alpha, -2.0 * cos, 1.0 - alpha])
    }

    pub fn audio_eq_lowpass(frequency: f64, q: f64) -> BiquadFilterDef {
        BiquadFilterDef::cookbook(Pass::Low, frequency, q)
    }

    pub fn audio_eq_highpass(frequency: f64, q: f64) -> BiquadFilterDef {
        BiquadFilterDef::cookbook(Pass::High, frequency, q)
    }

    /// The complex response at `frequency` hz.
    pub fn frequency_response(&self, frequency: f64) -> Complex64 {
        let z_inv = Complex64::from_polar(1.0, -2.0 * PI * frequency / SR as f64);
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        (b0 + z_inv * (b1 + z_inv * b2)) / (1.0 + z_inv * (a1 + z_inv * a2))
    }
}

impl MonoBiquadFilter {
    pub fn new(def: BiquadFilterDef) -> MonoBiquadFilter {
        MonoBiquadFilter {
            def,
            state: [0.0; 2],
        }
    }

    pub fn tick(&mut self, input: f64) -> f64 {
        let [b0, b1, b2] = self.def.b;
        let [a1, a2] = self.def.a;
        let out = b0 * input + self.state[0];
        self.state[0] = b1 * input - a1 * out + self.state[1];
        self.state[1] = b2 * input - a2 * out;
        out
    }
}
