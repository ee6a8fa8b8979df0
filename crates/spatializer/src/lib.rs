//! Binaural spatialization of mono sources with measured head-related impulse responses.
//!
//! The pieces, in the order audio meets them:
//!
//! - [dataset] reads a CIPIC-style HRIR dataset into an immutable [HrirGrid].
//! - [direction] turns listener and source positions into an azimuth, elevation and distance.
//! - [interpolation] turns that direction into a pair of impulses from the grid.
//! - [switcher] crossfades each source's convolution onto the new impulses.
//!
//! [Engine] ties them together.
#[cfg(test)]
mod close_floats;
mod config;
pub mod dataset;
pub mod direction;
mod engine;
mod error;
pub mod grid;
pub mod interpolation;
mod source_id;
pub mod switcher;

pub use config::*;
pub use dataset::{DatasetLayout, DatasetSource, MemorySource, WavDirectorySource};
pub use direction::{DirectionSample, Pose};
pub use engine::{Engine, ReadyHandle};
pub use error::{Error, LoadError, Result};
pub use grid::{Ear, GridAxes, HrirGrid, HrirPair, ImpulseResponse, Variant};
pub use interpolation::InterpolationMode;
pub use source_id::SourceId;

pub use nalgebra;
