//! The public face of the crate.
//!
//! An [Engine] owns one shared grid and one [ConvolutionSwitcher] per sound source.  The grid is published through an
//! [ArcSwapOption] exactly once per load: readers either see nothing, in which case updates fail with a not-ready
//! error, or they see a complete grid.  No lock is taken on the update or render paths.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use arc_swap::ArcSwapOption;
use nalgebra::Vector3;
use spatializer_dsp::DbExt;

use crate::config::EngineConfig;
use crate::dataset::{load_grid, DatasetSource};
use crate::direction::{DirectionSample, Pose};
use crate::error::{Error, LoadError, Result};
use crate::grid::{HrirGrid, Variant};
use crate::interpolation::{evaluate, InterpolationMode};
use crate::source_id::SourceId;
use crate::switcher::{distance_attenuation, ConvolutionSwitcher};

/// Tracks a load started by [Engine::initialize].
#[derive(Debug)]
pub struct ReadyHandle {
    ready: Arc<AtomicBool>,
    loader: JoinHandle<Result<(), LoadError>>,
}

impl ReadyHandle {
    /// Has this load published its grid?
    ///
    /// Stays false forever if the load fails; [ReadyHandle::wait] says why.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Block until loading finishes.
    pub fn wait(self) -> Result<()> {
        match self.loader.join() {
            Ok(res) => Ok(res?),
            Err(_) => Err(LoadError::LoaderPanicked.into()),
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    grid: Arc<ArcSwapOption<HrirGrid>>,
    mode: InterpolationMode,
    sources: HashMap<SourceId, ConvolutionSwitcher>,
}

/// Checks that can be made before spending time on a load.
fn validate_source(source: &dyn DatasetSource) -> Result<(), LoadError> {
    if !source.variants().contains(&Variant::Raw) {
        return Err(LoadError::MissingRawVariant);
    }
    if source.layout().impulse_len == 0 {
        return Err(LoadError::EmptyImpulse);
    }
    Ok(())
}

impl Engine {
    pub fn new(config: EngineConfig) -> Engine {
        Engine {
            mode: config.mode,
            config,
            grid: Default::default(),
            sources: Default::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start loading `source` in the background.
    ///
    /// Problems which can be seen without reading any data are reported here.  Everything else comes out of
    /// [ReadyHandle::wait].  Until the load finishes any grid published by an earlier load stays in use.
    pub fn initialize<S: DatasetSource + 'static>(&self, source: S) -> Result<ReadyHandle> {
        validate_source(&source)?;

        let ready = Arc::new(AtomicBool::new(false));
        let grid = self.grid.clone();
        let derive = self.config.derive_phase_variants;
        let thread_ready = ready.clone();

        let loader = std::thread::Builder::new()
            .name("hrir-loader".into())
            .spawn(move || {
                let loaded = load_grid(&source, derive).map_err(|e| {
                    log::error!("Loading the HRIR dataset failed: {e}");
                    e
                })?;
                grid.store(Some(Arc::new(loaded)));
                thread_ready.store(true, Ordering::Release);
                Ok(())
            })
            .map_err(LoadError::Spawn)?;

        Ok(ReadyHandle { ready, loader })
    }

    /// Load `source` on this thread, returning once the grid is published.
    pub fn load_blocking(&self, source: &dyn DatasetSource) -> Result<()> {
        validate_source(source)?;
        let loaded = load_grid(source, self.config.derive_phase_variants)?;
        self.grid.store(Some(Arc::new(loaded)));
        Ok(())
    }

    /// Is any grid available?
    pub fn is_ready(&self) -> bool {
        self.grid.load().is_some()
    }

    /// The current grid, if loaded.
    pub fn grid(&self) -> Option<Arc<HrirGrid>> {
        self.grid.load_full()
    }

    pub fn mode(&self) -> InterpolationMode {
        self.mode
    }

    /// Change how future updates pick impulses.  Sources keep their current impulses until their next update.
    ///
    /// Fails if the grid is loaded and lacks the mode's variant.  Before loading completes any mode is accepted, and
    /// the check moves to [Engine::update].
    pub fn set_mode(&mut self, mode: InterpolationMode) -> Result<()> {
        if let Some(grid) = self.grid.load_full() {
            if !grid.has_variant(mode.variant()) {
                log::warn!("Not switching to {mode}: the grid has no {} table", mode.variant());
                return Err(Error::missing_variant(mode.variant()));
            }
        }

        if mode != self.mode {
            log::info!("Interpolation mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        Ok(())
    }

    pub fn add_source(&mut self) -> SourceId {
        let id = SourceId::new();
        self.sources
            .insert(id, ConvolutionSwitcher::new(&self.config));
        log::debug!("Added source {id}");
        id
    }

    pub fn remove_source(&mut self, id: SourceId) -> Result<()> {
        self.sources
            .remove(&id)
            .map(|_| log::debug!("Removed source {id}"))
            .ok_or_else(|| Error::unknown_source(id))
    }

    /// Point a source in a new direction.
    ///
    /// On any error the source carries on with whatever impulses it had.
    pub fn update(&mut self, id: SourceId, direction: DirectionSample) -> Result<()> {
        let Some(switcher) = self.sources.get_mut(&id) else {
            return Err(Error::unknown_source(id));
        };

        if !direction.is_finite() {
            log::warn!("Rejecting update of {id}: {direction:?} is not finite");
            return Err(Error::invalid_direction(direction));
        }

        let Some(grid) = self.grid.load_full() else {
            log::warn!("Rejecting update of {id}: the grid is not loaded yet");
            return Err(Error::not_ready());
        };

        let pair = evaluate(&grid, &direction, self.mode).map_err(|e| {
            log::warn!("Rejecting update of {id}: {e}");
            e
        })?;

        log::debug!(
            "{id}: azimuth {:.2}, elevation {:.2}, distance {:.2} ({:.1} dB) via {}",
            direction.azimuth,
            direction.elevation,
            direction.distance,
            distance_attenuation(direction.distance).gain_to_db(),
            self.mode
        );
        switcher.switch_to(pair, direction.distance);
        Ok(())
    }

    /// Like [Engine::update], for a source at `position` in world space heard by `listener`.
    pub fn update_from_pose(&mut self, id: SourceId, listener: &Pose, position: &Vector3<f64>) -> Result<()> {
        self.update(id, listener.direction_to(position))
    }

    /// Render a block of a source's mono input to interleaved stereo.
    ///
    /// # Panics
    ///
    /// If `output` is not twice the length of `input`.
    pub fn render(&mut self, id: SourceId, input: &[f32], output: &mut [f32]) -> Result<()> {
        let switcher = self
            .sources
            .get_mut(&id)
            .ok_or_else(|| Error::unknown_source(id))?;
        switcher.render(input, output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dataset::{DatasetLayout, MemorySource};
    use crate::grid::test_grids::*;
    use crate::grid::Ear;

    fn affine_source(variants: &[Variant]) -> MemorySource {
        MemorySource::from_grid(&affine_grid(small_axes(), 4, variants)).unwrap()
    }

    fn nn_config() -> EngineConfig {
        EngineConfig::builder()
            .derive_phase_variants(false)
            .build()
            .unwrap()
    }

    #[test]
    fn test_update_before_ready() {
        let mut engine = Engine::new(nn_config());
        let id = engine.add_source();
        assert!(!engine.is_ready());

        let err = engine
            .update(id, DirectionSample::new(0.0, 0.0, 1.0))
            .unwrap_err();
        assert!(err.is_not_ready(), "{err}");
        assert!(engine.sources[&id].active_impulses().is_none());
    }

    #[test]
    fn test_nearest_neighbor_update() {
        let mut engine = Engine::new(nn_config());
        engine
            .load_blocking(&affine_source(&[Variant::Raw]))
            .unwrap();
        let id = engine.add_source();

        engine
            .update(id, DirectionSample::new(8.0, 30.0, 3.0))
            .unwrap();
        let grid = engine.grid().unwrap();
        let expected = grid.get(Variant::Raw, 10.0, 40.0).unwrap();
        let switcher = &engine.sources[&id];
        assert_eq!(switcher.active_impulses(), Some(expected));
        assert!((switcher.distance_gain() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_failed_updates_change_nothing() {
        let mut engine = Engine::new(nn_config());
        engine
            .load_blocking(&affine_source(&[Variant::Raw]))
            .unwrap();
        let id = engine.add_source();
        engine
            .update(id, DirectionSample::new(0.0, 0.0, 1.0))
            .unwrap();
        let before = engine.sources[&id].active_impulses().cloned();
        let active = engine.sources[&id].active_index();

        let err = engine
            .update(id, DirectionSample::new(f64::NAN, 0.0, 1.0))
            .unwrap_err();
        assert!(err.is_invalid_direction());

        // Mode validation is deferred when the mode is set before loading, so force the failure at update time.
        engine.mode = InterpolationMode::LinearPhaseBilinear;
        let err = engine
            .update(id, DirectionSample::new(0.0, 0.0, 1.0))
            .unwrap_err();
        assert!(err.is_missing_variant());

        assert_eq!(engine.sources[&id].active_impulses().cloned(), before);
        assert_eq!(engine.sources[&id].active_index(), active);
    }

    #[test]
    fn test_unknown_sources() {
        let mut engine = Engine::new(nn_config());
        let id = engine.add_source();
        engine.remove_source(id).unwrap();

        assert!(engine.remove_source(id).unwrap_err().is_unknown_source());
        assert!(engine
            .update(id, DirectionSample::new(0.0, 0.0, 1.0))
            .unwrap_err()
            .is_unknown_source());
        let mut out = [0.0f32; 4];
        assert!(engine
            .render(id, &[0.0; 2], &mut out)
            .unwrap_err()
            .is_unknown_source());
    }

    #[test]
    fn test_set_mode_checks_variants() {
        let mut engine = Engine::new(nn_config());
        engine
            .set_mode(InterpolationMode::MinimumPhaseBilinear)
            .unwrap();
        engine
            .load_blocking(&affine_source(&[Variant::Raw]))
            .unwrap();

        assert!(engine
            .set_mode(InterpolationMode::LinearPhaseBilinear)
            .unwrap_err()
            .is_missing_variant());
        assert_eq!(engine.mode(), InterpolationMode::MinimumPhaseBilinear);

        engine.set_mode(InterpolationMode::Bilinear).unwrap();
        assert_eq!(engine.mode(), InterpolationMode::Bilinear);
    }

    #[test]
    fn test_background_load() {
        let engine = Engine::new(EngineConfig::default());
        let handle = engine
            .initialize(affine_source(&[Variant::Raw]))
            .unwrap();
        handle.wait().unwrap();
        assert!(engine.is_ready());
        assert_eq!(engine.grid().unwrap().variants().count(), 3);
    }

    #[test]
    fn test_background_load_failure() {
        let engine = Engine::new(nn_config());
        let layout = DatasetLayout::new(small_axes(), 4);
        let mut source = MemorySource::new(layout.clone());
        for &az in small_axes().azimuths() {
            source
                .insert(Variant::Raw, az, Ear::Left, vec![0.0; layout.channel_len()])
                .unwrap();
            source
                .insert(Variant::Raw, az, Ear::Right, vec![0.0; 3])
                .unwrap();
        }

        let handle = engine.initialize(source).unwrap();
        let err = handle.wait().unwrap_err();
        assert!(err.is_load());
        assert!(matches!(
            err.as_load_error(),
            Some(LoadError::WrongLength { .. })
        ));
        assert!(!engine.is_ready());
    }

    #[test]
    fn test_initialize_validates_synchronously() {
        let engine = Engine::new(nn_config());
        let source = MemorySource::new(DatasetLayout::new(small_axes(), 4));
        let err = engine.initialize(source).unwrap_err();
        assert!(matches!(
            err.as_load_error(),
            Some(LoadError::MissingRawVariant)
        ));
    }
}
