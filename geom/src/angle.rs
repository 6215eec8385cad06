use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An angle, stored in radians. 0 points along +x, and angles grow counter-clockwise.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub fn new_rads(rads: f64) -> Angle {
        Angle(rads)
    }

    pub fn degrees(degs: f64) -> Angle {
        Angle(degs.to_radians())
    }

    pub fn opposite(self) -> Angle {
        Angle(self.0 + PI)
    }

    pub fn rotate_degs(self, degrees: f64) -> Angle {
        Angle(self.0 + degrees.to_radians())
    }

    /// [0, 2pi)
    pub fn normalized_radians(self) -> f64 {
        let rads = self.0 % (2.0 * PI);
        if rads < 0.0 {
            rads + 2.0 * PI
        } else {
            rads
        }
    }

    /// [0, 360)
    pub fn normalized_degrees(self) -> f64 {
        self.normalized_radians().to_degrees()
    }

    /// The signed rotation needed to turn from this angle to `other`, in degrees, within
    /// (-180, 180]. Positive is counter-clockwise (a left turn), negative is clockwise.
    pub fn shortest_rotation_towards(self, other: Angle) -> f64 {
        let mut delta = (other.normalized_degrees() - self.normalized_degrees()) % 360.0;
        if delta > 180.0 {
            delta -= 360.0;
        } else if delta <= -180.0 {
            delta += 360.0;
        }
        delta
    }

    /// The unsigned difference between two angles, in [0, 180].
    pub fn abs_degrees_to(self, other: Angle) -> f64 {
        self.shortest_rotation_towards(other).abs()
    }

    /// True if the two angles are within `within_degrees` of each other.
    pub fn approx_eq(self, other: Angle, within_degrees: f64) -> bool {
        self.abs_degrees_to(other) <= within_degrees
    }

    /// Round to the nearest multiple of `step_degrees`.
    pub fn snap_degs(self, step_degrees: f64) -> Angle {
        let degs = self.normalized_degrees();
        Angle::degrees((degs / step_degrees).round() * step_degrees)
    }

    /// The (cos, sin) unit vector pointing this way.
    pub fn unit_vector(self) -> (f64, f64) {
        let (sin, cos) = self.0.sin_cos();
        (cos, sin)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.normalized_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_is_signed_and_wraps() {
        let east = Angle::degrees(0.0);
        assert!((east.shortest_rotation_towards(Angle::degrees(90.0)) - 90.0).abs() < 1e-9);
        assert!((east.shortest_rotation_towards(Angle::degrees(-90.0)) + 90.0).abs() < 1e-9);
        assert!((east.shortest_rotation_towards(Angle::degrees(350.0)) + 10.0).abs() < 1e-9);
        // Exactly backwards is reported as +180, never -180
        assert!((east.shortest_rotation_towards(Angle::degrees(180.0)) - 180.0).abs() < 1e-9);
        assert!(
            (Angle::degrees(90.0).shortest_rotation_towards(Angle::degrees(-90.0)) - 180.0).abs()
                < 1e-9
        );
    }

    #[test]
    fn snapping_to_grid() {
        assert!(Angle::degrees(44.0).snap_degs(90.0).approx_eq(Angle::ZERO, 1e-9));
        assert!(Angle::degrees(46.0)
            .snap_degs(90.0)
            .approx_eq(Angle::degrees(90.0), 1e-9));
        assert!(Angle::degrees(-80.0)
            .snap_degs(90.0)
            .approx_eq(Angle::degrees(270.0), 1e-9));
    }
}
