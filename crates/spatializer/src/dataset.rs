//! Getting HRIRs off disk and into a [HrirGrid].
//!
//! Datasets are laid out the CIPIC way: for every azimuth and ear, one mono channel holding every elevation's impulse
//! back to back, in ascending elevation order.  A [DatasetSource] hands those channels over; [load_grid] checks them,
//! slices them up, and builds the grid.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use spatializer_dsp::{phase, SR};

use crate::error::LoadError;
use crate::grid::*;

/// The shape of a dataset: its grid and how long each impulse is.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetLayout {
    pub axes: GridAxes,
    pub impulse_len: usize,
}

impl DatasetLayout {
    pub fn new(axes: GridAxes, impulse_len: usize) -> DatasetLayout {
        DatasetLayout { axes, impulse_len }
    }

    /// 25 azimuths, 50 elevations, 200 samples.
    pub fn cipic() -> DatasetLayout {
        DatasetLayout::new(GridAxes::cipic(), CIPIC_IMPULSE_LEN)
    }

    /// Samples in one (azimuth, ear) channel.
    pub fn channel_len(&self) -> usize {
        self.axes.elevations().len() * self.impulse_len
    }
}

/// Somewhere to get dataset channels from.
///
/// Sources are read from the loader's thread pool, so they must be shareable.
pub trait DatasetSource: Send + Sync {
    fn layout(&self) -> &DatasetLayout;

    /// The variants this source can supply.
    fn variants(&self) -> Vec<Variant>;

    /// The channel for one azimuth and ear, which should be [DatasetLayout::channel_len] samples.
    fn read_channel(&self, variant: Variant, azimuth: f64, ear: Ear) -> Result<Vec<f32>, LoadError>;
}

/// The file name CIPIC-style datasets use for a channel, e.g. `neg45azleft.wav` or `0azright.wav`.
pub fn cipic_file_name(azimuth: f64, ear: Ear) -> String {
    let sign = if azimuth < 0.0 { "neg" } else { "" };
    format!("{}{}az{}.wav", sign, azimuth.abs(), ear)
}

/// Read a mono wave file at [SR], converting integer formats to floats in `[-1, 1]`.
pub fn read_mono_wav(path: &Path) -> Result<Vec<f32>, LoadError> {
    let decode = |source| LoadError::Decode {
        path: path.to_owned(),
        source,
    };

    let reader = hound::WavReader::open(path).map_err(decode)?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(LoadError::NotMono {
            path: path.to_owned(),
            channels: spec.channels,
        });
    }

    if spec.sample_rate != SR {
        return Err(LoadError::SampleRate {
            path: path.to_owned(),
            expected: SR,
            found: spec.sample_rate,
        });
    }

    match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(decode),
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode)
        }
    }
}

/// Write mono 32-bit float samples at [SR].
pub fn write_mono_wav(path: &Path, samples: &[f32]) -> Result<(), LoadError> {
    let encode = |source| LoadError::Encode {
        path: path.to_owned(),
        source,
    };

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SR,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(encode)?;
    for s in samples {
        writer.write_sample(*s).map_err(encode)?;
    }
    writer.finalize().map_err(encode)
}

/// A dataset on disk, one directory of CIPIC-named wave files per variant.
#[derive(Clone, Debug)]
pub struct WavDirectorySource {
    layout: DatasetLayout,
    directories: Vec<(Variant, PathBuf)>,
}

impl WavDirectorySource {
    /// A CIPIC-layout dataset with raw impulses in `raw`.
    pub fn new(raw: impl Into<PathBuf>) -> WavDirectorySource {
        WavDirectorySource::with_layout(DatasetLayout::cipic(), raw)
    }

    pub fn with_layout(layout: DatasetLayout, raw: impl Into<PathBuf>) -> WavDirectorySource {
        WavDirectorySource {
            layout,
            directories: vec![(Variant::Raw, raw.into())],
        }
    }

    /// Also read `variant` from `directory`, replacing any directory previously given for it.
    pub fn with_variant(mut self, variant: Variant, directory: impl Into<PathBuf>) -> WavDirectorySource {
        self.directories.retain(|(v, _)| *v != variant);
        self.directories.push((variant, directory.into()));
        self
    }

    fn directory(&self, variant: Variant) -> Option<&Path> {
        self.directories
            .iter()
            .find(|(v, _)| *v == variant)
            .map(|(_, d)| d.as_path())
    }
}

impl DatasetSource for WavDirectorySource {
    fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    fn variants(&self) -> Vec<Variant> {
        self.directories.iter().map(|(v, _)| *v).collect()
    }

    fn read_channel(&self, variant: Variant, azimuth: f64, ear: Ear) -> Result<Vec<f32>, LoadError> {
        let Some(dir) = self.directory(variant) else {
            return Err(LoadError::MissingChannel {
                variant,
                azimuth,
                ear,
            });
        };
        read_mono_wav(&dir.join(cipic_file_name(azimuth, ear)))
    }
}

/// A dataset already in memory.
#[derive(Clone, Debug)]
pub struct MemorySource {
    layout: DatasetLayout,
    channels: HashMap<(Variant, usize, Ear), Vec<f32>>,
}

impl MemorySource {
    pub fn new(layout: DatasetLayout) -> MemorySource {
        MemorySource {
            layout,
            channels: Default::default(),
        }
    }

    /// Set the channel for `azimuth` and `ear`.  Lengths are not checked until loading.
    pub fn insert(
        &mut self,
        variant: Variant,
        azimuth: f64,
        ear: Ear,
        samples: Vec<f32>,
    ) -> Result<(), LoadError> {
        let Some(az_bin) = self.layout.axes.azimuth_bin(azimuth) else {
            return Err(LoadError::OffGrid {
                variant,
                azimuth,
                elevation: f64::NAN,
            });
        };
        self.channels.insert((variant, az_bin, ear), samples);
        Ok(())
    }

    /// Build a source holding every table of `grid`.
    ///
    /// All impulses of a table must share a length, since channels concatenate them.
    pub fn from_grid(grid: &HrirGrid) -> Result<MemorySource, LoadError> {
        let axes = grid.axes().clone();
        let mut layout = DatasetLayout::new(axes.clone(), 0);
        let mut channels = HashMap::new();

        for variant in grid.variants() {
            for az_bin in 0..axes.azimuths().len() {
                for ear in Ear::BOTH {
                    let channel = concatenate_channel(grid, variant, az_bin, ear)?;
                    layout.impulse_len = channel.len() / axes.elevations().len();
                    channels.insert((variant, az_bin, ear), channel);
                }
            }
        }

        Ok(MemorySource { layout, channels })
    }
}

impl DatasetSource for MemorySource {
    fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    fn variants(&self) -> Vec<Variant> {
        Variant::ALL
            .into_iter()
            .filter(|v| self.channels.keys().any(|(cv, _, _)| cv == v))
            .collect()
    }

    fn read_channel(&self, variant: Variant, azimuth: f64, ear: Ear) -> Result<Vec<f32>, LoadError> {
        self.layout
            .axes
            .azimuth_bin(azimuth)
            .and_then(|az_bin| self.channels.get(&(variant, az_bin, ear)))
            .cloned()
            .ok_or(LoadError::MissingChannel {
                variant,
                azimuth,
                ear,
            })
    }
}

/// All elevations at one azimuth for one ear, back to back.
fn concatenate_channel(grid: &HrirGrid, variant: Variant, az_bin: usize, ear: Ear) -> Result<Vec<f32>, LoadError> {
    let axes = grid.axes();
    let mut channel = vec![];
    let mut expected_len = None;

    for el_bin in 0..axes.elevations().len() {
        let Some(pair) = grid.get_by_bin(variant, az_bin, el_bin) else {
            return Err(LoadError::MissingChannel {
                variant,
                azimuth: axes.azimuths()[az_bin],
                ear,
            });
        };
        let impulse = pair.ear(ear).as_slice();
        let expected = *expected_len.get_or_insert(impulse.len());
        if impulse.len() != expected {
            return Err(LoadError::WrongLength {
                variant,
                azimuth: axes.azimuths()[az_bin],
                ear,
                expected,
                found: impulse.len(),
            });
        }
        channel.extend_from_slice(impulse);
    }

    Ok(channel)
}

/// Write one table of `grid` to `directory` as CIPIC-named wave files, creating the directory if needed.
pub fn write_cipic_directory(grid: &HrirGrid, variant: Variant, directory: &Path) -> Result<(), LoadError> {
    fs::create_dir_all(directory).map_err(|source| LoadError::Io {
        path: directory.to_owned(),
        source,
    })?;

    let axes = grid.axes();
    (0..axes.azimuths().len())
        .into_par_iter()
        .flat_map(|az_bin| Ear::BOTH.into_par_iter().map(move |ear| (az_bin, ear)))
        .try_for_each(|(az_bin, ear)| {
            let channel = concatenate_channel(grid, variant, az_bin, ear)?;
            let path = directory.join(cipic_file_name(axes.azimuths()[az_bin], ear));
            write_mono_wav(&path, &channel)
        })?;

    log::info!("Wrote the {variant} table to {}", directory.display());
    Ok(())
}

/// Both ears of one azimuth, as read from a source.
struct AzimuthChannels {
    variant: Variant,
    az_bin: usize,
    left: Vec<f32>,
    right: Vec<f32>,
}

fn read_azimuth(source: &dyn DatasetSource, variant: Variant, az_bin: usize) -> Result<AzimuthChannels, LoadError> {
    let layout = source.layout();
    let azimuth = layout.axes.azimuths()[az_bin];
    let expected = layout.channel_len();

    let [left, right] = Ear::BOTH.map(|ear| {
        let channel = source.read_channel(variant, azimuth, ear)?;
        if channel.len() != expected {
            return Err(LoadError::WrongLength {
                variant,
                azimuth,
                ear,
                expected,
                found: channel.len(),
            });
        }
        Ok(channel)
    });

    Ok(AzimuthChannels {
        variant,
        az_bin,
        left: left?,
        right: right?,
    })
}

/// Compute a phase variant for every point from the raw table.
fn derive_variant(builder: &mut GridBuilder, variant: Variant) -> Result<(), LoadError> {
    let reconstruct: fn(&[f32]) -> Vec<f32> = match variant {
        Variant::MinimumPhase => phase::minimum_phase,
        Variant::LinearPhase => phase::linear_phase,
        Variant::Raw => return Ok(()),
    };

    let n_el = builder.axes().elevations().len();
    let points = builder.axes().point_count();
    let shared: &GridBuilder = builder;

    let derived = (0..points)
        .into_par_iter()
        .map(|cell| {
            let (az_bin, el_bin) = (cell / n_el, cell % n_el);
            let raw = shared
                .get_by_bin(Variant::Raw, az_bin, el_bin)
                .ok_or_else(|| LoadError::MissingGridPoint {
                    variant: Variant::Raw,
                    azimuth: shared.axes().azimuths()[az_bin],
                    elevation: shared.axes().elevations()[el_bin],
                })?;
            let pair = HrirPair::new(
                reconstruct(raw.left.as_slice()),
                reconstruct(raw.right.as_slice()),
            );
            Ok((az_bin, el_bin, pair))
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    for (az_bin, el_bin, pair) in derived {
        builder.load_bins(variant, az_bin, el_bin, pair)?;
    }

    Ok(())
}

/// Read every channel of `source` and build a grid.
///
/// Channels are read in parallel.  Any channel of the wrong length fails the whole load: the grid is never built with
/// truncated or padded impulses.  If `derive_phase_variants` is set, phase variants the source lacks are computed from
/// the raw table.
pub fn load_grid(source: &dyn DatasetSource, derive_phase_variants: bool) -> Result<HrirGrid, LoadError> {
    let started = Instant::now();
    let layout = source.layout();
    let variants = source.variants();

    if !variants.contains(&Variant::Raw) {
        return Err(LoadError::MissingRawVariant);
    }
    if layout.impulse_len == 0 {
        return Err(LoadError::EmptyImpulse);
    }

    log::info!(
        "Loading {} variants over {} azimuths x {} elevations",
        variants.len(),
        layout.axes.azimuths().len(),
        layout.axes.elevations().len()
    );

    let n_az = layout.axes.azimuths().len();
    let channels = variants
        .par_iter()
        .flat_map(|variant| (0..n_az).into_par_iter().map(move |az_bin| (*variant, az_bin)))
        .map(|(variant, az_bin)| read_azimuth(source, variant, az_bin))
        .collect::<Result<Vec<_>, LoadError>>()?;

    let mut builder = GridBuilder::new(layout.axes.clone());
    let len = layout.impulse_len;
    for AzimuthChannels {
        variant,
        az_bin,
        left,
        right,
    } in channels
    {
        for (el_bin, (l, r)) in left.chunks_exact(len).zip(right.chunks_exact(len)).enumerate() {
            builder.load_bins(variant, az_bin, el_bin, HrirPair::new(l, r))?;
        }
    }

    if derive_phase_variants {
        for variant in [Variant::MinimumPhase, Variant::LinearPhase] {
            if !builder.has_variant(variant) {
                log::info!("Deriving the {variant} table");
                derive_variant(&mut builder, variant)?;
            }
        }
    }

    let grid = builder.finish()?;
    log::info!(
        "Loaded {} grid points ({}) in {:?}",
        grid.axes().point_count(),
        grid.variants()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        started.elapsed()
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::grid::test_grids::*;

    fn small_layout() -> DatasetLayout {
        DatasetLayout::new(small_axes(), 4)
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("spatializer-{}-{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_file_names() {
        assert_eq!(cipic_file_name(-45.0, Ear::Left), "neg45azleft.wav");
        assert_eq!(cipic_file_name(0.0, Ear::Right), "0azright.wav");
        assert_eq!(cipic_file_name(80.0, Ear::Left), "80azleft.wav");
        assert_eq!(cipic_file_name(-5.0, Ear::Right), "neg5azright.wav");
    }

    #[test]
    fn test_cipic_layout() {
        assert_eq!(DatasetLayout::cipic().channel_len(), 10000);
    }

    #[test]
    fn test_memory_round_trip() {
        let grid = affine_grid(small_axes(), 4, &[Variant::Raw]);
        let source = MemorySource::from_grid(&grid).unwrap();
        assert_eq!(source.layout(), &small_layout());

        let loaded = load_grid(&source, false).unwrap();
        assert_eq!(loaded.variants().collect::<Vec<_>>(), vec![Variant::Raw]);
        for &az in small_axes().azimuths() {
            for &el in small_axes().elevations() {
                assert_eq!(
                    loaded.get(Variant::Raw, az, el).unwrap(),
                    grid.get(Variant::Raw, az, el).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_spans_are_in_elevation_order() {
        let layout = small_layout();
        let mut source = MemorySource::new(layout.clone());
        for &az in layout.axes.azimuths() {
            for ear in Ear::BOTH {
                let channel = (0..layout.channel_len()).map(|i| i as f32).collect();
                source.insert(Variant::Raw, az, ear, channel).unwrap();
            }
        }

        let grid = load_grid(&source, false).unwrap();
        let top = grid.get(Variant::Raw, 30.0, 40.0).unwrap();
        assert_eq!(top.left.as_slice(), &[8.0, 9.0, 10.0, 11.0]);
        let bottom = grid.get(Variant::Raw, -10.0, -40.0).unwrap();
        assert_eq!(bottom.right.as_slice(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let grid = affine_grid(small_axes(), 4, &[Variant::Raw]);
        let mut source = MemorySource::from_grid(&grid).unwrap();
        source.insert(Variant::Raw, 10.0, Ear::Right, vec![0.0; 11]).unwrap();

        match load_grid(&source, false) {
            Err(LoadError::WrongLength {
                azimuth,
                ear,
                expected,
                found,
                ..
            }) => {
                assert_eq!(azimuth, 10.0);
                assert_eq!(ear, Ear::Right);
                assert_eq!(expected, 12);
                assert_eq!(found, 11);
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_missing_channel_is_rejected() {
        let layout = small_layout();
        let mut source = MemorySource::new(layout.clone());
        for &az in layout.axes.azimuths() {
            source
                .insert(Variant::Raw, az, Ear::Left, vec![0.5; layout.channel_len()])
                .unwrap();
        }
        assert!(matches!(
            load_grid(&source, false),
            Err(LoadError::MissingChannel { ear: Ear::Right, .. })
        ));
    }

    #[test]
    fn test_raw_is_required() {
        let grid = affine_grid(small_axes(), 4, &[Variant::Raw]);
        let raw = MemorySource::from_grid(&grid).unwrap();
        let mut source = MemorySource::new(raw.layout().clone());
        for &az in small_axes().azimuths() {
            for ear in Ear::BOTH {
                let channel = raw.read_channel(Variant::Raw, az, ear).unwrap();
                source.insert(Variant::MinimumPhase, az, ear, channel).unwrap();
            }
        }
        assert!(matches!(
            load_grid(&source, false),
            Err(LoadError::MissingRawVariant)
        ));
    }

    #[test]
    fn test_phase_variants_are_derived() {
        let mut builder = GridBuilder::new(small_axes());
        for &az in small_axes().azimuths() {
            for &el in small_axes().elevations() {
                builder
                    .load(Variant::Raw, az, el, vec![0.0, 0.0, 1.0, 0.0], vec![0.0, 0.5, 0.0, 0.0])
                    .unwrap();
            }
        }
        let source = MemorySource::from_grid(&builder.finish().unwrap()).unwrap();

        let grid = load_grid(&source, true).unwrap();
        assert_eq!(grid.variants().collect::<Vec<_>>(), Variant::ALL.to_vec());

        let min = grid.get(Variant::MinimumPhase, 0.0, 0.0).unwrap();
        assert_eq!(min.left.len(), 4);
        // A delayed delta's minimum phase version has all its energy up front.
        assert!((min.left.as_slice()[0] - 1.0).abs() < 1e-3);
        assert!((min.right.as_slice()[0] - 0.5).abs() < 1e-3);

        assert_eq!(grid.get(Variant::LinearPhase, 30.0, 40.0).unwrap().right.len(), 4);
    }

    #[test]
    fn test_wav_directory_round_trip() {
        let dir = scratch_dir("wav-round-trip");
        let grid = affine_grid(small_axes(), 4, &[Variant::Raw, Variant::MinimumPhase]);

        write_cipic_directory(&grid, Variant::Raw, &dir.join("raw")).unwrap();
        write_cipic_directory(&grid, Variant::MinimumPhase, &dir.join("min")).unwrap();
        assert!(dir.join("raw").join("neg10azleft.wav").exists());
        assert!(dir.join("min").join("30azright.wav").exists());

        let source = WavDirectorySource::with_layout(small_layout(), dir.join("raw"))
            .with_variant(Variant::MinimumPhase, dir.join("min"));
        let loaded = load_grid(&source, false).unwrap();
        assert_eq!(
            loaded.variants().collect::<Vec<_>>(),
            vec![Variant::Raw, Variant::MinimumPhase]
        );
        assert_eq!(
            loaded.get(Variant::MinimumPhase, -10.0, 0.0).unwrap(),
            grid.get(Variant::MinimumPhase, -10.0, 0.0).unwrap()
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_wav_format_checks() {
        let dir = scratch_dir("wav-format");
        fs::create_dir_all(&dir).unwrap();

        let stereo = dir.join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: SR,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&stereo, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();
        assert!(matches!(
            read_mono_wav(&stereo),
            Err(LoadError::NotMono { channels: 2, .. })
        ));

        let slow = dir.join("slow.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&slow, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();
        assert!(matches!(
            read_mono_wav(&slow),
            Err(LoadError::SampleRate { found: 22050, .. })
        ));

        let ints = dir.join("ints.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SR,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&ints, spec).unwrap();
        writer.write_sample(16384i16).unwrap();
        writer.write_sample(-32768i16).unwrap();
        writer.finalize().unwrap();
        assert_eq!(read_mono_wav(&ints).unwrap(), vec![0.5, -1.0]);

        assert!(matches!(
            read_mono_wav(&dir.join("missing.wav")),
            Err(LoadError::Decode { .. })
        ));

        fs::remove_dir_all(&dir).unwrap();
    }
}
