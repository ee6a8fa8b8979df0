//! Mapping continuous directions onto the grid.
//!
//! Everything here is pure computation over an already-loaded [HrirGrid]: no allocation beyond the returned impulses,
//! no locks, no FFTs.  The phase variants are precomputed tables, so the three bilinear modes run the same code and
//! differ only in which table they read.
use crate::direction::DirectionSample;
use crate::error::{Error, Result};
use crate::grid::{Ear, HrirGrid, HrirPair, ImpulseResponse, Variant};

/// How [evaluate] turns a direction into impulses.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, derive_more::Display)]
pub enum InterpolationMode {
    /// Snap to the closest grid point.  Cheapest, and audibly steppy as sources move.
    #[default]
    #[display(fmt = "nearest-neighbor")]
    NearestNeighbor,

    /// Blend the four surrounding measured impulses.
    #[display(fmt = "bilinear")]
    Bilinear,

    /// Blend the four surrounding minimum-phase impulses.
    #[display(fmt = "minimum-phase-bilinear")]
    MinimumPhaseBilinear,

    /// Blend the four surrounding linear-phase impulses.
    #[display(fmt = "linear-phase-bilinear")]
    LinearPhaseBilinear,
}

impl InterpolationMode {
    pub const ALL: [InterpolationMode; 4] = [
        InterpolationMode::NearestNeighbor,
        InterpolationMode::Bilinear,
        InterpolationMode::MinimumPhaseBilinear,
        InterpolationMode::LinearPhaseBilinear,
    ];

    /// The grid table this mode reads.
    pub fn variant(&self) -> Variant {
        match self {
            InterpolationMode::NearestNeighbor | InterpolationMode::Bilinear => Variant::Raw,
            InterpolationMode::MinimumPhaseBilinear => Variant::MinimumPhase,
            InterpolationMode::LinearPhaseBilinear => Variant::LinearPhase,
        }
    }
}

/// Index of the grid value closest to `value`.
///
/// Values outside the axis clamp to the nearest end.  When `value` is exactly halfway between two grid values the
/// lower index wins; results must be reproducible, so this tie-break is part of the contract.  `O(log n)`.
///
/// NaN maps to index 0.
///
/// # Panics
///
/// If `axis` is empty.
pub fn nearest_index(axis: &[f64], value: f64) -> usize {
    assert!(!axis.is_empty());

    if value.is_nan() {
        return 0;
    }

    // First index whose value is at least `value`.
    let upper = axis.partition_point(|&g| g < value);
    if upper == 0 {
        return 0;
    }
    if upper == axis.len() {
        return axis.len() - 1;
    }

    let lower = upper - 1;
    if value - axis[lower] <= axis[upper] - value {
        lower
    } else {
        upper
    }
}

/// The indices of the two grid values bracketing `value`, given `idx` from [nearest_index].
///
/// If `axis[idx] < value` the cell is `(idx, idx + 1)`, otherwise `(idx - 1, idx)`.  Both are clamped to the axis, so
/// at and beyond the ends `lo == hi`.
pub fn cell_corners(axis: &[f64], idx: usize, value: f64) -> (usize, usize) {
    let last = axis.len() - 1;
    if axis[idx] < value {
        (idx.min(last), (idx + 1).min(last))
    } else {
        (idx.saturating_sub(1), idx.min(last))
    }
}

/// Position of `value` between `lo` and `hi` as a fraction.
///
/// A degenerate cell (`lo == hi`) has no extent to be a fraction of; it gets 0.5, splitting the weight evenly between
/// two corners which are in fact the same point.
fn axis_fraction(lo: f64, hi: f64, value: f64) -> f64 {
    if lo == hi {
        0.5
    } else {
        (value - lo) / (hi - lo)
    }
}

/// Bilinear weights for the corners `(az1, el1), (az1, el2), (az2, el1), (az2, el2)`, in that order.
pub fn bilinear_weights(az1: f64, az2: f64, el1: f64, el2: f64, az: f64, el: f64) -> [f64; 4] {
    let t_az = axis_fraction(az1, az2, az);
    let t_el = axis_fraction(el1, el2, el);
    [
        (1.0 - t_az) * (1.0 - t_el),
        (1.0 - t_az) * t_el,
        t_az * (1.0 - t_el),
        t_az * t_el,
    ]
}

/// Where a direction lands on the grid: four corner bins and their weights.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridCell {
    /// `(az_bin, el_bin)` in the same order as [bilinear_weights].
    pub corners: [(usize, usize); 4],
    pub weights: [f64; 4],
}

impl GridCell {
    pub fn locate(grid: &HrirGrid, azimuth: f64, elevation: f64) -> GridCell {
        let azimuths = grid.axes().azimuths();
        let elevations = grid.axes().elevations();

        let (a1, a2) = cell_corners(azimuths, nearest_index(azimuths, azimuth), azimuth);
        let (e1, e2) = cell_corners(elevations, nearest_index(elevations, elevation), elevation);

        GridCell {
            corners: [(a1, e1), (a1, e2), (a2, e1), (a2, e2)],
            weights: bilinear_weights(
                azimuths[a1],
                azimuths[a2],
                elevations[e1],
                elevations[e2],
                azimuth,
                elevation,
            ),
        }
    }
}

/// Sum `weights[i] * impulses[i]`.
///
/// Equal-length impulses are summed at their own length.  Mixed lengths are all zero-padded to the next power of two
/// at least as long as the longest, so every corner contributes over the same span.
pub fn blend(impulses: [&[f32]; 4], weights: [f64; 4]) -> Vec<f32> {
    let longest = impulses.iter().map(|i| i.len()).max().unwrap_or(0);
    let len = if impulses.iter().all(|i| i.len() == longest) {
        longest
    } else {
        longest.next_power_of_two()
    };

    let mut out = vec![0.0f64; len];
    for (impulse, weight) in impulses.iter().zip(weights) {
        for (o, s) in out.iter_mut().zip(impulse.iter()) {
            *o += weight * *s as f64;
        }
    }
    out.into_iter().map(|x| x as f32).collect()
}

/// Impulses for a direction, per `mode`.
///
/// Fails if the grid has no table for the mode's variant.
pub fn evaluate(grid: &HrirGrid, direction: &DirectionSample, mode: InterpolationMode) -> Result<HrirPair> {
    let variant = mode.variant();
    if !grid.has_variant(variant) {
        return Err(Error::missing_variant(variant));
    }

    let axes = grid.axes();
    if mode == InterpolationMode::NearestNeighbor {
        let az_bin = nearest_index(axes.azimuths(), direction.azimuth);
        let el_bin = nearest_index(axes.elevations(), direction.elevation);
        return grid
            .get_by_bin(variant, az_bin, el_bin)
            .cloned()
            .ok_or_else(|| Error::missing_variant(variant));
    }

    let cell = GridCell::locate(grid, direction.azimuth, direction.elevation);
    let mut corners = Vec::with_capacity(4);
    for (az_bin, el_bin) in cell.corners {
        corners.push(
            grid.get_by_bin(variant, az_bin, el_bin)
                .ok_or_else(|| Error::missing_variant(variant))?,
        );
    }

    let [left, right] = Ear::BOTH.map(|ear| {
        let impulses = [0, 1, 2, 3].map(|i| corners[i].ear(ear).as_slice());
        ImpulseResponse::from(blend(impulses, cell.weights))
    });
    Ok(HrirPair { left, right })
}
