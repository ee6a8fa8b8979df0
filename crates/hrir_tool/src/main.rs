//! Offline tools for HRIR datasets.
//!
//! - `inspect` loads a dataset and logs what is in it.
//! - `derive` writes the minimum- or linear-phase version of a dataset to a new directory.
//! - `render` spatializes a mono file, optionally moving the source around the listener.
//!
//! Logging goes through `env_logger`, at `info` unless `RUST_LOG` says otherwise.
mod cli_args;
mod commands;

fn main() -> anyhow::Result<()> {
    use clap::Parser;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli_args::CliArgs::parse();
    commands::dispatch_command(args)
}
