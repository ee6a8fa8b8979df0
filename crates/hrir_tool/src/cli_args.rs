//! Definition of the Clap command line.
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use spatializer::{InterpolationMode, Variant};

#[derive(Debug, Parser)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a dataset and summarize it.
    Inspect(InspectArgs),

    /// Compute a phase variant of a dataset and write it out as a new dataset directory.
    Derive(DeriveArgs),

    /// Spatialize a mono wave file.
    Render(RenderArgs),
}

#[derive(Debug, Parser)]
pub struct DatasetArgs {
    /// Directory of raw CIPIC-named wave files.
    pub dataset: PathBuf,

    /// Directory holding a precomputed minimum-phase variant.
    #[arg(long)]
    pub minimum_phase: Option<PathBuf>,

    /// Directory holding a precomputed linear-phase variant.
    #[arg(long)]
    pub linear_phase: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct InspectArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,
}

#[derive(Debug, Parser)]
pub struct DeriveArgs {
    /// Directory of raw CIPIC-named wave files.
    pub input: PathBuf,

    /// Where to write the derived dataset.  Created if missing.
    pub output: PathBuf,

    #[arg(long, value_enum)]
    pub variant: PhaseArg,
}

#[derive(Debug, Parser)]
pub struct RenderArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Mono wave file at 44100 hz.
    #[arg(long)]
    pub input: PathBuf,

    /// Stereo wave file to write.
    #[arg(long)]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t = ModeArg::Bilinear)]
    pub mode: ModeArg,

    /// Source position relative to a listener at the origin facing -z.
    #[arg(long, num_args = 3, allow_negative_numbers = true, default_values_t = [1.0, 0.0, -1.0])]
    pub position: Vec<f64>,

    /// If set, the source circles the listener once every this many seconds.
    #[arg(long)]
    pub orbit_seconds: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    NearestNeighbor,
    Bilinear,
    MinimumPhaseBilinear,
    LinearPhaseBilinear,
}

impl From<ModeArg> for InterpolationMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::NearestNeighbor => InterpolationMode::NearestNeighbor,
            ModeArg::Bilinear => InterpolationMode::Bilinear,
            ModeArg::MinimumPhaseBilinear => InterpolationMode::MinimumPhaseBilinear,
            ModeArg::LinearPhaseBilinear => InterpolationMode::LinearPhaseBilinear,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum PhaseArg {
    MinimumPhase,
    LinearPhase,
}

impl From<PhaseArg> for Variant {
    fn from(value: PhaseArg) -> Self {
        match value {
            PhaseArg::MinimumPhase => Variant::MinimumPhase,
            PhaseArg::LinearPhase => Variant::LinearPhase,
        }
    }
}
