/// The fixed sample rate of the library.
///
/// Everything internal runs at this rate and only this rate.  It is also the rate of the CIPIC measurements the
/// engine is built around, so the impulse responses never need resampling.  Datasets recorded at other rates are
/// rejected at load time rather than converted.
pub const SR: u32 = 44100;
