use anyhow::{Context, Result};
use itertools::iproduct;

use spatializer::dataset::load_grid;
use spatializer::{Ear, HrirGrid, Variant};

use crate::cli_args::{CliArgs, InspectArgs};

/// The grid point whose impulse for `ear` has the largest peak, as `(azimuth, elevation, peak)`.
fn loudest(grid: &HrirGrid, variant: Variant, ear: Ear) -> Option<(f64, f64, f32)> {
    let axes = grid.axes();
    iproduct!(0..axes.azimuths().len(), 0..axes.elevations().len())
        .filter_map(|(az_bin, el_bin)| {
            let pair = grid.get_by_bin(variant, az_bin, el_bin)?;
            let peak = pair
                .ear(ear)
                .as_slice()
                .iter()
                .fold(0.0f32, |acc, x| acc.max(x.abs()));
            Some((axes.azimuths()[az_bin], axes.elevations()[el_bin], peak))
        })
        .max_by(|a, b| a.2.total_cmp(&b.2))
}

pub fn inspect(_top_args: &CliArgs, args: &InspectArgs) -> Result<()> {
    let source = super::dataset_source(&args.dataset);
    let grid = load_grid(&source, false)
        .with_context(|| format!("Loading {}", args.dataset.dataset.display()))?;

    let axes = grid.axes();
    log::info!(
        "{} azimuths from {} to {}, {} elevations from {} to {}",
        axes.azimuths().len(),
        axes.azimuths()[0],
        axes.azimuths()[axes.azimuths().len() - 1],
        axes.elevations().len(),
        axes.elevations()[0],
        axes.elevations()[axes.elevations().len() - 1],
    );
    log::info!(
        "{} points, impulses up to {} samples",
        axes.point_count(),
        grid.max_impulse_len()
    );

    for variant in grid.variants() {
        for ear in Ear::BOTH {
            if let Some((azimuth, elevation, peak)) = loudest(&grid, variant, ear) {
                log::info!(
                    "{variant} {ear}: loudest at azimuth {azimuth}, elevation {elevation}, peak {peak:.4}"
                );
            }
        }
    }

    Ok(())
}
