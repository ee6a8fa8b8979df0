//! Signal processing building blocks for the spatializer.
//!
//! Everything here is either realtime-safe per-sample or per-block work (filters, convolution, gain ramps) or, in
//! [phase], offline batch work used while preparing datasets.
pub mod biquad;
#[cfg(test)]
mod close_floats;
mod config;
pub mod convolution;
pub mod crossover;
mod db;
pub mod phase;
pub mod ramp;
pub mod time;

pub use config::SR;
pub use convolution::FirConvolver;
pub use crossover::Crossover;
pub use db::DbExt;
pub use ramp::GainRamp;
pub use time::{frames_for, SampleClock, SampleTimestamp};
