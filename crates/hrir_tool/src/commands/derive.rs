use anyhow::{Context, Result};

use spatializer::dataset::{load_grid, write_cipic_directory};
use spatializer::{Variant, WavDirectorySource};

use crate::cli_args::{CliArgs, DeriveArgs};

pub fn derive(_top_args: &CliArgs, args: &DeriveArgs) -> Result<()> {
    let variant = Variant::from(args.variant);
    let source = WavDirectorySource::new(&args.input);
    let grid = load_grid(&source, true)
        .with_context(|| format!("Loading {}", args.input.display()))?;

    write_cipic_directory(&grid, variant, &args.output)
        .with_context(|| format!("Writing the {variant} dataset"))?;
    Ok(())
}
