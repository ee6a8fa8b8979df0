//! Listener-relative directions.
//!
//! The convention is interaural-polar, matching how CIPIC measured its grid:
//!
//! - `azimuth = asin(x / d)`: the lateral angle, from -90 (left) to 90 (right).  It folds front and back together.
//! - `elevation = atan2(y, -z)`: the angle around the interaural axis, 0 straight ahead, 90 overhead, 180 behind.
//!
//! with `-z` forward, `+x` right and `+y` up in the listener's frame.  The lateral angle loses precision near +/-90
//! degrees, where `asin` is flat; that is where CIPIC stops measuring anyway, and the grid lookup clamps there.
use nalgebra::{UnitQuaternion, Vector3};

/// Displacements shorter than this are treated as the listener and source coinciding.
pub const DEGENERATE_DISTANCE: f64 = 1e-9;

/// Where a source is relative to a listener, for one update.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DirectionSample {
    /// Degrees.
    pub azimuth: f64,

    /// Degrees.
    pub elevation: f64,

    /// In the same units as the positions it was computed from.
    pub distance: f64,
}

impl DirectionSample {
    pub fn new(azimuth: f64, elevation: f64, distance: f64) -> DirectionSample {
        DirectionSample {
            azimuth,
            elevation,
            distance,
        }
    }

    /// Compute the direction of a displacement already expressed in the listener's frame.
    ///
    /// When the displacement is (nearly) zero there is no direction; this returns azimuth and elevation 0, which has
    /// no physical meaning but keeps the lookup well defined.
    pub fn from_local(local: &Vector3<f64>) -> DirectionSample {
        let distance = local.norm();
        if distance <= DEGENERATE_DISTANCE {
            return DirectionSample::new(0.0, 0.0, distance);
        }

        // Rounding can push the ratio a hair outside [-1, 1].
        let azimuth = (local.x / distance).clamp(-1.0, 1.0).asin().to_degrees();
        let elevation = local.y.atan2(-local.z).to_degrees();
        DirectionSample::new(azimuth, elevation, distance)
    }

    pub fn is_finite(&self) -> bool {
        self.azimuth.is_finite() && self.elevation.is_finite() && self.distance.is_finite()
    }
}

/// A listener's position and orientation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Pose {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }
}

impl Pose {
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Pose {
        Pose {
            position,
            orientation,
        }
    }

    /// Move `world` into this listener's frame.
    pub fn to_local(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.orientation
            .inverse_transform_vector(&(world - self.position))
    }

    /// The direction of a source at `source` in world space.
    pub fn direction_to(&self, source: &Vector3<f64>) -> DirectionSample {
        DirectionSample::from_local(&self.to_local(source))
    }
}
