use anyhow::{ensure, Context, Result};

use spatializer::dataset::read_mono_wav;
use spatializer::nalgebra::{UnitQuaternion, Vector3};
use spatializer::{frames_for, Engine, EngineConfig, InterpolationMode, Pose, SR, UPDATE_INTERVAL};

use crate::cli_args::{CliArgs, RenderArgs};

/// Where the source is `seconds` into the file: `start` rotated about the vertical axis if orbiting.
fn source_position(start: &Vector3<f64>, orbit_seconds: Option<f64>, seconds: f64) -> Vector3<f64> {
    let Some(period) = orbit_seconds else {
        return *start;
    };
    let angle = std::f64::consts::TAU * seconds / period;
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle) * start
}

/// Frames rendered between direction updates.
fn update_block() -> usize {
    frames_for(UPDATE_INTERVAL) as usize
}

pub fn render(_top_args: &CliArgs, args: &RenderArgs) -> Result<()> {
    if let Some(period) = args.orbit_seconds {
        ensure!(
            period > 0.0 && period.is_finite(),
            "Orbit period must be positive"
        );
    }

    let mut engine = Engine::new(EngineConfig::default());

    let input = read_mono_wav(&args.input)
        .with_context(|| format!("Reading {}", args.input.display()))?;

    let ready = engine.initialize(super::dataset_source(&args.dataset))?;
    ready.wait().context("Loading the dataset")?;
    engine.set_mode(InterpolationMode::from(args.mode))?;

    let source = engine.add_source();
    let listener = Pose::default();
    let start = Vector3::new(args.position[0], args.position[1], args.position[2]);

    let block = update_block();
    let mut output = vec![0.0f32; input.len() * 2];

    for (index, (inp, out)) in input
        .chunks(block)
        .zip(output.chunks_mut(block * 2))
        .enumerate()
    {
        let seconds = (index * block) as f64 / SR as f64;
        let position = source_position(&start, args.orbit_seconds, seconds);
        engine.update_from_pose(source, &listener, &position)?;
        engine.render(source, inp, out)?;
    }

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SR,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)
        .with_context(|| format!("Creating {}", args.output.display()))?;
    for s in output {
        writer.write_sample(s)?;
    }

    // Catch any errors from hound.
    writer.finalize()?;

    log::info!(
        "Wrote {:.2} seconds to {}",
        input.len() as f64 / SR as f64,
        args.output.display()
    );
    Ok(())
}
