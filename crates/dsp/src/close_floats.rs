//! Threshold-based floating point asserts for tests.
//!
//! Thresholds here are usually far bigger than epsilon: filter designs and FFT round trips are only ever checked to a
//! few hundredths of a dB or a few parts in a million.

#[track_caller]
pub(crate) fn close_floats64(a: f64, b: f64, threshold: f64) {
    let diff = (a - b).abs();
    assert!(
        diff < threshold,
        "{} vs {}, difference {} is greater than threshold {}",
        a,
        b,
        diff,
        threshold
    );
}

/// Compare two slices elementwise, reporting the first offending index.
#[track_caller]
pub(crate) fn close_slices32(a: &[f32], b: &[f32], threshold: f32) {
    assert_eq!(a.len(), b.len(), "Slices differ in length");
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        assert!(
            diff < threshold,
            "index {}: {} vs {}, difference {} is greater than threshold {}",
            i,
            x,
            y,
            diff,
            threshold
        );
    }
}
