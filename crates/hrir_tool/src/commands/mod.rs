mod derive;
mod inspect;
mod render;

use anyhow::Result;

use spatializer::{Variant, WavDirectorySource};

use crate::cli_args;

/// Figure out what command to run, then run it.
pub fn dispatch_command(args: cli_args::CliArgs) -> Result<()> {
    match &args.command {
        cli_args::Command::Inspect(i) => inspect::inspect(&args, i),
        cli_args::Command::Derive(d) => derive::derive(&args, d),
        cli_args::Command::Render(r) => render::render(&args, r),
    }
}

fn dataset_source(args: &cli_args::DatasetArgs) -> WavDirectorySource {
    let mut source = WavDirectorySource::new(&args.dataset);
    if let Some(dir) = &args.minimum_phase {
        source = source.with_variant(Variant::MinimumPhase, dir);
    }
    if let Some(dir) = &args.linear_phase {
        source = source.with_variant(Variant::LinearPhase, dir);
    }
    source
}
