use std::time::Duration;

use crate::interpolation::InterpolationMode;

pub use spatializer_dsp::{frames_for, SR};

/// How often a driver is expected to call [crate::Engine::update].
///
/// Nothing enforces this.  It is longer than the default transition, so crossfades normally complete before the next
/// one starts.
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(50);

/// Settings fixed for the life of an [crate::Engine].
#[derive(Clone, Debug, PartialEq, derive_builder::Builder)]
#[builder(pattern = "owned", build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Below this frequency, in hz, input bypasses the HRIRs.
    #[builder(default = "200.0")]
    pub crossover_frequency: f64,

    /// Length of the crossfade between the old and new impulses on each update.
    #[builder(default = "Duration::from_millis(25)")]
    pub transition_duration: Duration,

    /// Linear gain applied to input before anything else.
    #[builder(default = "10.0")]
    pub input_gain: f64,

    /// The mode the engine starts in.
    #[builder(default)]
    pub mode: InterpolationMode,

    /// If the dataset lacks the minimum- or linear-phase tables, compute them from the raw one while loading.
    #[builder(default = "true")]
    pub derive_phase_variants: bool,
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(freq) = self.crossover_frequency {
            let nyquist = SR as f64 / 2.0;
            if !(freq > 0.0 && freq < nyquist) {
                return Err(format!(
                    "Crossover frequency must be between 0 and {nyquist} hz, got {freq}"
                ));
            }
        }

        if let Some(gain) = self.input_gain {
            if !gain.is_finite() {
                return Err(format!("Input gain must be finite, got {gain}"));
            }
        }

        Ok(())
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            crossover_frequency: 200.0,
            transition_duration: Duration::from_millis(25),
            input_gain: 10.0,
            mode: InterpolationMode::NearestNeighbor,
            derive_phase_variants: true,
        }
    }
}
