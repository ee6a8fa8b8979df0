use std::time::Duration;

use spatializer::nalgebra::{UnitQuaternion, Vector3};
use spatializer::*;
use spatializer_dsp::Crossover;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn small_axes() -> GridAxes {
    GridAxes::new(vec![-45.0, 0.0, 45.0], vec![-40.0, 0.0, 40.0, 180.0]).unwrap()
}

/// A grid where every point's left ear is `delta(0)` and right ear is `right_gain * delta(0)`.
fn uniform_source(right_gain: f32) -> MemorySource {
    let axes = small_axes();
    let mut builder = grid::GridBuilder::new(axes.clone());
    for &az in axes.azimuths() {
        for &el in axes.elevations() {
            builder
                .load(
                    Variant::Raw,
                    az,
                    el,
                    vec![1.0, 0.0, 0.0, 0.0],
                    vec![right_gain, 0.0, 0.0, 0.0],
                )
                .unwrap();
        }
    }
    MemorySource::from_grid(&builder.finish().unwrap()).unwrap()
}

/// A grid whose right ear gets louder, and left ear quieter, toward the right.
fn lateral_source() -> MemorySource {
    let axes = small_axes();
    let mut builder = grid::GridBuilder::new(axes.clone());
    for &az in axes.azimuths() {
        for &el in axes.elevations() {
            let gain = (az as f32 + 45.0) / 90.0;
            builder
                .load(Variant::Raw, az, el, vec![1.0 - gain, 0.0], vec![gain, 0.0])
                .unwrap();
        }
    }
    MemorySource::from_grid(&builder.finish().unwrap()).unwrap()
}

fn instant_config(mode: InterpolationMode) -> EngineConfig {
    EngineConfig::builder()
        .transition_duration(Duration::ZERO)
        .input_gain(1.0)
        .mode(mode)
        .derive_phase_variants(false)
        .build()
        .unwrap()
}

fn noise(frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| (((i * 7919 + 13) % 257) as f32 / 128.0) - 1.0)
        .collect()
}

#[test]
fn test_not_ready_until_loaded() {
    init_logging();

    let mut engine = Engine::new(instant_config(InterpolationMode::NearestNeighbor));
    let id = engine.add_source();
    let err = engine
        .update(id, DirectionSample::new(0.0, 0.0, 0.0))
        .unwrap_err();
    assert!(err.is_not_ready());

    let handle = engine.initialize(uniform_source(0.5)).unwrap();
    handle.wait().unwrap();
    assert!(engine.is_ready());
    engine
        .update(id, DirectionSample::new(0.0, 0.0, 0.0))
        .unwrap();
}

#[test]
fn test_high_band_is_spatialized() {
    init_logging();

    let mut engine = Engine::new(instant_config(InterpolationMode::NearestNeighbor));
    engine.load_blocking(&uniform_source(0.5)).unwrap();
    let id = engine.add_source();
    engine
        .update(id, DirectionSample::new(10.0, 5.0, 1.0))
        .unwrap();

    let input = noise(2048);
    let mut output = vec![0.0f32; 4096];
    engine.render(id, &input, &mut output).unwrap();

    let mut reference = Crossover::new(engine.config().crossover_frequency);
    for (i, x) in input.iter().enumerate() {
        let (low, high) = reference.split(*x as f64);
        let expected_left = (low + high) * 0.5;
        let expected_right = (low + 0.5 * high) * 0.5;
        assert!(
            (output[i * 2] as f64 - expected_left).abs() < 1e-4,
            "Frame {i} left: {} vs {expected_left}",
            output[i * 2]
        );
        assert!(
            (output[i * 2 + 1] as f64 - expected_right).abs() < 1e-4,
            "Frame {i} right: {} vs {expected_right}",
            output[i * 2 + 1]
        );
    }
}

#[test]
fn test_distance_falloff() {
    init_logging();

    let mut engine = Engine::new(instant_config(InterpolationMode::Bilinear));
    engine.load_blocking(&uniform_source(1.0)).unwrap();
    let near = engine.add_source();
    let far = engine.add_source();

    let listener = Pose::default();
    engine
        .update_from_pose(near, &listener, &Vector3::new(0.0, 0.0, 0.0))
        .unwrap();
    engine
        .update_from_pose(far, &listener, &Vector3::new(0.0, 0.0, -3.0))
        .unwrap();

    let input = noise(512);
    let mut near_out = vec![0.0f32; 1024];
    let mut far_out = vec![0.0f32; 1024];
    engine.render(near, &input, &mut near_out).unwrap();
    engine.render(far, &input, &mut far_out).unwrap();

    for (n, f) in near_out.iter().zip(far_out.iter()) {
        assert!((n * 0.1 - f).abs() < 1e-5, "{n} vs {f}");
    }
}

#[test]
fn test_listener_orientation_moves_the_image() {
    init_logging();

    let config = EngineConfig::builder()
        .mode(InterpolationMode::Bilinear)
        .derive_phase_variants(false)
        .build()
        .unwrap();
    let mut engine = Engine::new(config);
    engine.load_blocking(&lateral_source()).unwrap();
    let id = engine.add_source();

    let energy = |engine: &mut Engine, listener: &Pose| {
        engine
            .update_from_pose(id, listener, &Vector3::new(0.0, 0.0, -1.0))
            .unwrap();
        // Let the crossfade finish before measuring.
        let settle = frames_for(engine.config().transition_duration) as usize;
        let mut scratch = vec![0.0f32; settle * 2];
        engine.render(id, &noise(settle), &mut scratch).unwrap();

        let mut out = vec![0.0f32; 8192];
        engine.render(id, &noise(4096), &mut out).unwrap();
        let left = out.iter().step_by(2).map(|x| x * x).sum::<f32>();
        let right = out.iter().skip(1).step_by(2).map(|x| x * x).sum::<f32>();
        (left, right)
    };

    // Straight ahead, the ears are balanced.
    let (l, r) = energy(&mut engine, &Pose::default());
    assert!((l - r).abs() / (l + r) < 0.05, "{l} vs {r}");

    // Turned left, the source is on the listener's right.
    let turned = Pose::new(
        Vector3::zeros(),
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_4),
    );
    let (l, r) = energy(&mut engine, &turned);
    assert!(r > l * 1.5, "{l} vs {r}");
}

#[test]
fn test_long_run_at_update_cadence() {
    init_logging();

    let mut engine = Engine::new(EngineConfig::default());
    engine.load_blocking(&lateral_source()).unwrap();
    engine
        .set_mode(InterpolationMode::MinimumPhaseBilinear)
        .unwrap();
    let id = engine.add_source();

    let block = frames_for(UPDATE_INTERVAL) as usize;
    let input = noise(block);
    let mut output = vec![0.0f32; block * 2];
    let listener = Pose::default();

    for step in 0..40 {
        let angle = step as f64 * 0.3;
        let position = Vector3::new(angle.sin() * 2.0, 0.5, -angle.cos() * 2.0);
        engine.update_from_pose(id, &listener, &position).unwrap();
        engine.render(id, &input, &mut output).unwrap();
        assert!(output.iter().all(|x| x.is_finite() && x.abs() < 100.0));
    }
}
