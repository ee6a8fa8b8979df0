use std::path::PathBuf;

use crate::direction::DirectionSample;
use crate::grid::{Ear, Variant};
use crate::source_id::SourceId;

/// Something was wrong with the dataset.
///
/// These are fatal to the variant being loaded: the grid is never published with holes in it.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{variant} azimuth {azimuth} {ear} ear: expected {expected} samples, found {found}")]
    WrongLength {
        variant: Variant,
        azimuth: f64,
        ear: Ear,
        expected: usize,
        found: usize,
    },

    #[error("{variant}: nothing loaded for azimuth {azimuth}, elevation {elevation}")]
    MissingGridPoint {
        variant: Variant,
        azimuth: f64,
        elevation: f64,
    },

    #[error("{variant}: azimuth {azimuth}, elevation {elevation} is not a point of this grid")]
    OffGrid {
        variant: Variant,
        azimuth: f64,
        elevation: f64,
    },

    #[error("{variant}: the dataset has no {ear} channel for azimuth {azimuth}")]
    MissingChannel {
        variant: Variant,
        azimuth: f64,
        ear: Ear,
    },

    #[error("Datasets must supply the raw variant")]
    MissingRawVariant,

    #[error("Impulse responses may not be empty")]
    EmptyImpulse,

    #[error("Invalid grid axes: {0}")]
    InvalidAxes(String),

    #[error("{}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("{}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: expected a mono file, found {channels} channels", path.display())]
    NotMono { path: PathBuf, channels: u16 },

    #[error("{}: expected {expected} hz, found {found} hz", path.display())]
    SampleRate {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("Could not start the dataset loader thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("The dataset loader thread panicked")]
    LoaderPanicked,
}

#[derive(Debug, derive_more::Display, derive_more::IsVariant)]
enum ErrorPayload {
    #[display(fmt = "Dataset load error: {}", _0)]
    Load(LoadError),

    #[display(fmt = "The HRIR grid has not finished loading")]
    NotReady,

    #[display(fmt = "No grid point at azimuth {}, elevation {}", azimuth, elevation)]
    NotFound { azimuth: f64, elevation: f64 },

    #[display(fmt = "The grid has no {} variant", _0)]
    MissingVariant(Variant),

    #[display(fmt = "Direction is not finite: {:?}", _0)]
    InvalidDirection(DirectionSample),

    #[display(fmt = "Unknown sound source {}", _0)]
    UnknownSource(SourceId),
}

#[derive(Debug, thiserror::Error)]
#[error("{payload}")]
pub struct Error {
    payload: ErrorPayload,
}

macro_rules! conv {
    ($variant: ident, $from_err: path) => {
        impl From<$from_err> for Error {
            fn from(value: $from_err) -> Error {
                Error {
                    payload: ErrorPayload::$variant(value),
                }
            }
        }
    };
}

conv!(Load, LoadError);

impl Error {
    pub(crate) fn not_ready() -> Error {
        Error {
            payload: ErrorPayload::NotReady,
        }
    }

    pub(crate) fn not_found(azimuth: f64, elevation: f64) -> Error {
        Error {
            payload: ErrorPayload::NotFound { azimuth, elevation },
        }
    }

    pub(crate) fn missing_variant(variant: Variant) -> Error {
        Error {
            payload: ErrorPayload::MissingVariant(variant),
        }
    }

    pub(crate) fn invalid_direction(direction: DirectionSample) -> Error {
        Error {
            payload: ErrorPayload::InvalidDirection(direction),
        }
    }

    pub(crate) fn unknown_source(id: SourceId) -> Error {
        Error {
            payload: ErrorPayload::UnknownSource(id),
        }
    }

    /// Was a lookup attempted before the grid finished loading?
    ///
    /// This is the one recoverable error: retry once [crate::ReadyHandle] says the grid is ready.
    pub fn is_not_ready(&self) -> bool {
        self.payload.is_not_ready()
    }

    /// Was an exact lookup made for a coordinate which isn't on the grid?
    pub fn is_not_found(&self) -> bool {
        self.payload.is_not_found()
    }

    pub fn is_load(&self) -> bool {
        self.payload.is_load()
    }

    pub fn is_missing_variant(&self) -> bool {
        self.payload.is_missing_variant()
    }

    pub fn is_invalid_direction(&self) -> bool {
        self.payload.is_invalid_direction()
    }

    pub fn is_unknown_source(&self) -> bool {
        self.payload.is_unknown_source()
    }

    /// The underlying dataset problem, if this is a load error.
    pub fn as_load_error(&self) -> Option<&LoadError> {
        match &self.payload {
            ErrorPayload::Load(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
