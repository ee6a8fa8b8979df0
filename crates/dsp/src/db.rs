use num::Float;

/// An extension trait for floating point types to convert to and from DB.
///
/// ```
/// use spatializer_dsp::DbExt;
/// let gain = (-6.0f64).db_to_gain();
/// assert!((gain - 0.5).abs() < 0.01);
/// ```
pub trait DbExt {
    fn db_to_gain(self) -> Self;
    fn gain_to_db(self) -> Self;
}

impl<T: Float> DbExt for T {
    fn db_to_gain(self) -> Self {
        let ten = T::from(10.0).unwrap_or_else(T::one);
        let twenty = T::from(20.0).unwrap_or_else(T::one);
        ten.powf(self / twenty)
    }

    fn gain_to_db(self) -> Self {
        let twenty = T::from(20.0).unwrap_or_else(T::one);
        twenty * self.log10()
    }
}
