//! The HRIR grid store.
//!
//! A grid is a rectangular table of impulse response pairs over a fixed set of azimuths and elevations, with one table
//! per [Variant].  Building and reading are split across two types: a [GridBuilder] is written once, point by point,
//! and [GridBuilder::finish] turns it into an immutable [HrirGrid] only if every table in use is fully populated.  The
//! type split is what makes reads during loading impossible, and an `HrirGrid` is `Send + Sync` so any number of sound
//! sources can share one.
//!
//! The store only does exact lookups.  Mapping a continuous direction onto the grid is [crate::interpolation]'s job.
use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{Error, LoadError, Result};

/// The CIPIC azimuths, in degrees.  Spacing is finer toward the median plane.
pub const CIPIC_AZIMUTHS: [f64; 25] = [
    -80.0, -65.0, -55.0, -45.0, -40.0, -35.0, -30.0, -25.0, -20.0, -15.0, -10.0, -5.0, 0.0, 5.0, 10.0, 15.0, 20.0, 25.0,
    30.0, 35.0, 40.0, 45.0, 55.0, 65.0, 80.0,
];

pub const CIPIC_ELEVATION_COUNT: usize = 50;
pub const CIPIC_ELEVATION_STEP: f64 = 5.625;
pub const CIPIC_MIN_ELEVATION: f64 = -40.0;

/// Length of every CIPIC impulse response, in samples at 44100 hz.
pub const CIPIC_IMPULSE_LEN: usize = 200;

/// Which reconstruction of the dataset a table holds.
///
/// All variants share the grid; they differ only in the phase of their impulses.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, derive_more::Display)]
pub enum Variant {
    /// As measured.
    #[display(fmt = "raw")]
    Raw,

    #[display(fmt = "minimum-phase")]
    MinimumPhase,

    #[display(fmt = "linear-phase")]
    LinearPhase,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Raw, Variant::MinimumPhase, Variant::LinearPhase];

    fn index(self) -> usize {
        match self {
            Variant::Raw => 0,
            Variant::MinimumPhase => 1,
            Variant::LinearPhase => 2,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, derive_more::Display)]
pub enum Ear {
    #[display(fmt = "left")]
    Left,
    #[display(fmt = "right")]
    Right,
}

impl Ear {
    pub const BOTH: [Ear; 2] = [Ear::Left, Ear::Right];
}

/// An immutable impulse response.  Clones share storage.
#[derive(Clone, Debug, PartialEq)]
pub struct ImpulseResponse(Arc<[f32]>);

impl ImpulseResponse {
    pub fn new(samples: impl Into<Arc<[f32]>>) -> ImpulseResponse {
        ImpulseResponse(samples.into())
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f32>> for ImpulseResponse {
    fn from(value: Vec<f32>) -> Self {
        ImpulseResponse::new(value)
    }
}

impl From<&[f32]> for ImpulseResponse {
    fn from(value: &[f32]) -> Self {
        ImpulseResponse::new(value)
    }
}

/// The impulses for both ears at one direction.
#[derive(Clone, Debug, PartialEq)]
pub struct HrirPair {
    pub left: ImpulseResponse,
    pub right: ImpulseResponse,
}

impl HrirPair {
    pub fn new(left: impl Into<ImpulseResponse>, right: impl Into<ImpulseResponse>) -> HrirPair {
        HrirPair {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn ear(&self, ear: Ear) -> &ImpulseResponse {
        match ear {
            Ear::Left => &self.left,
            Ear::Right => &self.right,
        }
    }
}

/// The azimuths and elevations a grid is sampled at.
///
/// Both axes are strictly increasing.  Spacing need not be uniform.
#[derive(Clone, Debug, PartialEq)]
pub struct GridAxes {
    azimuths: Vec<f64>,
    elevations: Vec<f64>,
}

fn validate_axis(name: &str, axis: &[f64]) -> Result<(), LoadError> {
    if axis.is_empty() {
        return Err(LoadError::InvalidAxes(format!("{name} axis is empty")));
    }

    if let Some(bad) = axis.iter().find(|x| !x.is_finite()) {
        return Err(LoadError::InvalidAxes(format!(
            "{name} axis contains {bad}"
        )));
    }

    if let Some(w) = axis.windows(2).find(|w| w[0] >= w[1]) {
        return Err(LoadError::InvalidAxes(format!(
            "{name} axis is not strictly increasing at {} then {}",
            w[0], w[1]
        )));
    }

    Ok(())
}

/// Index of `value` in a sorted axis, if it is exactly a grid value.
fn exact_bin(axis: &[f64], value: f64) -> Option<usize> {
    // NaN compares as less than everything and so is never found.
    axis.binary_search_by(|probe| probe.partial_cmp(&value).unwrap_or(Ordering::Less))
        .ok()
}

impl GridAxes {
    pub fn new(azimuths: Vec<f64>, elevations: Vec<f64>) -> Result<GridAxes, LoadError> {
        validate_axis("azimuth", &azimuths)?;
        validate_axis("elevation", &elevations)?;
        Ok(GridAxes {
            azimuths,
            elevations,
        })
    }

    /// The grid of the CIPIC database: 25 azimuths by 50 elevations.
    pub fn cipic() -> GridAxes {
        GridAxes {
            azimuths: CIPIC_AZIMUTHS.to_vec(),
            elevations: (0..CIPIC_ELEVATION_COUNT)
                .map(|i| CIPIC_MIN_ELEVATION + i as f64 * CIPIC_ELEVATION_STEP)
                .collect(),
        }
    }

    pub fn azimuths(&self) -> &[f64] {
        &self.azimuths
    }

    pub fn elevations(&self) -> &[f64] {
        &self.elevations
    }

    pub fn azimuth_bin(&self, azimuth: f64) -> Option<usize> {
        exact_bin(&self.azimuths, azimuth)
    }

    pub fn elevation_bin(&self, elevation: f64) -> Option<usize> {
        exact_bin(&self.elevations, elevation)
    }

    pub fn point_count(&self) -> usize {
        self.azimuths.len() * self.elevations.len()
    }

    fn cell(&self, az_bin: usize, el_bin: usize) -> usize {
        debug_assert!(az_bin < self.azimuths.len() && el_bin < self.elevations.len());
        az_bin * self.elevations.len() + el_bin
    }
}

/// The write-once phase of a grid.
#[derive(Debug)]
pub struct GridBuilder {
    axes: GridAxes,
    tables: [Option<Vec<Option<HrirPair>>>; 3],
}

impl GridBuilder {
    pub fn new(axes: GridAxes) -> GridBuilder {
        GridBuilder {
            axes,
            tables: Default::default(),
        }
    }

    pub fn axes(&self) -> &GridAxes {
        &self.axes
    }

    /// Store the impulses for one point.
    ///
    /// Each point is meant to be loaded once.  Loading a point twice is not an error: the last write wins.
    pub fn load(
        &mut self,
        variant: Variant,
        azimuth: f64,
        elevation: f64,
        left: impl Into<ImpulseResponse>,
        right: impl Into<ImpulseResponse>,
    ) -> Result<(), LoadError> {
        let (Some(az_bin), Some(el_bin)) = (
            self.axes.azimuth_bin(azimuth),
            self.axes.elevation_bin(elevation),
        ) else {
            return Err(LoadError::OffGrid {
                variant,
                azimuth,
                elevation,
            });
        };

        self.load_bins(variant, az_bin, el_bin, HrirPair::new(left, right))
    }

    /// Like [GridBuilder::load], but addressed by bin.
    pub(crate) fn load_bins(
        &mut self,
        variant: Variant,
        az_bin: usize,
        el_bin: usize,
        pair: HrirPair,
    ) -> Result<(), LoadError> {
        if pair.left.is_empty() || pair.right.is_empty() {
            return Err(LoadError::EmptyImpulse);
        }

        let cell = self.axes.cell(az_bin, el_bin);
        let points = self.axes.point_count();
        let table = self.tables[variant.index()].get_or_insert_with(|| vec![None; points]);

        if table[cell].replace(pair).is_some() {
            log::debug!(
                "{variant}: replaced impulses at azimuth {}, elevation {}",
                self.axes.azimuths[az_bin],
                self.axes.elevations[el_bin]
            );
        }

        Ok(())
    }

    pub fn has_variant(&self, variant: Variant) -> bool {
        self.tables[variant.index()].is_some()
    }

    pub(crate) fn get_by_bin(&self, variant: Variant, az_bin: usize, el_bin: usize) -> Option<&HrirPair> {
        let cell = self.axes.cell(az_bin, el_bin);
        self.tables[variant.index()].as_ref()?[cell].as_ref()
    }

    /// Check that the grid is complete and freeze it.
    ///
    /// The raw variant must be present.  Every variant which had at least one point loaded must have all of them.
    pub fn finish(self) -> Result<HrirGrid, LoadError> {
        if !self.has_variant(Variant::Raw) {
            return Err(LoadError::MissingRawVariant);
        }

        let GridBuilder { axes, tables } = self;
        let mut frozen: [Option<Box<[HrirPair]>>; 3] = Default::default();

        for variant in Variant::ALL {
            let Some(table) = tables[variant.index()].as_ref() else {
                continue;
            };

            let mut cells = Vec::with_capacity(table.len());
            for (cell, pair) in table.iter().enumerate() {
                let Some(pair) = pair else {
                    let n_el = axes.elevations.len();
                    return Err(LoadError::MissingGridPoint {
                        variant,
                        azimuth: axes.azimuths[cell / n_el],
                        elevation: axes.elevations[cell % n_el],
                    });
                };
                cells.push(pair.clone());
            }

            frozen[variant.index()] = Some(cells.into_boxed_slice());
        }

        Ok(HrirGrid {
            axes,
            tables: frozen,
        })
    }
}

/// A fully loaded, immutable grid of HRIRs.
#[derive(Debug)]
pub struct HrirGrid {
    axes: GridAxes,
    tables: [Option<Box<[HrirPair]>>; 3],
}

impl HrirGrid {
    pub fn axes(&self) -> &GridAxes {
        &self.axes
    }

    pub fn has_variant(&self, variant: Variant) -> bool {
        self.tables[variant.index()].is_some()
    }

    pub fn variants(&self) -> impl Iterator<Item = Variant> + '_ {
        Variant::ALL.into_iter().filter(|v| self.has_variant(*v))
    }

    /// The impulses at an exact grid coordinate.
    pub fn get(&self, variant: Variant, azimuth: f64, elevation: f64) -> Result<&HrirPair> {
        let (Some(az_bin), Some(el_bin)) = (
            self.axes.azimuth_bin(azimuth),
            self.axes.elevation_bin(elevation),
        ) else {
            return Err(Error::not_found(azimuth, elevation));
        };

        self.get_by_bin(variant, az_bin, el_bin)
            .ok_or_else(|| Error::missing_variant(variant))
    }

    /// The impulses at a pair of bins, or `None` if the variant is absent.
    ///
    /// # Panics
    ///
    /// If either bin is out of range.
    pub fn get_by_bin(&self, variant: Variant, az_bin: usize, el_bin: usize) -> Option<&HrirPair> {
        assert!(az_bin < self.axes.azimuths.len() && el_bin < self.axes.elevations.len());
        let cell = self.axes.cell(az_bin, el_bin);
        self.tables[variant.index()].as_ref().map(|t| &t[cell])
    }

    /// Length of the longest impulse in any table.
    pub fn max_impulse_len(&self) -> usize {
        self.tables
            .iter()
            .flatten()
            .flat_map(|t| t.iter())
            .map(|p| p.left.len().max(p.right.len()))
            .max()
            .unwrap_or(0)
    }
}
