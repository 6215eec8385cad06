use std::fmt;

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::{Angle, EPSILON_DIST};

/// A point on the ground plane, in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pt2D {
    x: f64,
    y: f64,
}

impl Pt2D {
    pub fn new(x: f64, y: f64) -> Pt2D {
        Pt2D { x, y }
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    pub fn dist_to(self, to: Pt2D) -> f64 {
        ((self.x - to.x).powi(2) + (self.y - to.y).powi(2)).sqrt()
    }

    /// True if the points are closer than `threshold`.
    pub fn approx_eq(self, other: Pt2D, threshold: f64) -> bool {
        self.dist_to(other) < threshold
    }

    pub fn angle_to(self, to: Pt2D) -> Angle {
        Angle::new_rads((to.y - self.y).atan2(to.x - self.x))
    }

    /// Move `dist` meters in the direction of `theta`. Negative distances go backwards.
    pub fn project_away(self, dist: f64, theta: Angle) -> Pt2D {
        let (sin, cos) = theta.normalized_radians().sin_cos();
        Pt2D::new(self.x + dist * cos, self.y + dist * sin)
    }

    pub fn offset(self, dx: f64, dy: f64) -> Pt2D {
        Pt2D::new(self.x + dx, self.y + dy)
    }

    /// Linear interpolation; `pct` isn't clamped.
    pub fn lerp(self, to: Pt2D, pct: f64) -> Pt2D {
        Pt2D::new(
            self.x + pct * (to.x - self.x),
            self.y + pct * (to.y - self.y),
        )
    }

    pub fn center(pts: &[Pt2D]) -> Pt2D {
        if pts.is_empty() {
            return Pt2D::new(0.0, 0.0);
        }
        let mut x = 0.0;
        let mut y = 0.0;
        for pt in pts {
            x += pt.x;
            y += pt.y;
        }
        let len = pts.len() as f64;
        Pt2D::new(x / len, y / len)
    }

    pub fn to_hashable(self) -> HashablePt2D {
        HashablePt2D::new(self.x, self.y)
    }

    /// Both coordinates are finite.
    pub fn is_valid(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    // Vector helpers, treating points as offsets from the origin.
    pub(crate) fn minus(self, other: Pt2D) -> (f64, f64) {
        (self.x - other.x, self.y - other.y)
    }
}

pub(crate) fn cross(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

pub(crate) fn dot(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.0 + a.1 * b.1
}

pub(crate) fn is_zero(v: (f64, f64)) -> bool {
    v.0.abs() < EPSILON_DIST && v.1.abs() < EPSILON_DIST
}

impl fmt::Display for Pt2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pt2D::new({}, {})", self.x, self.y)
    }
}

impl From<Pt2D> for [f64; 2] {
    fn from(pt: Pt2D) -> [f64; 2] {
        [pt.x, pt.y]
    }
}

/// This isn't opinionated about what the (x, y) represents. Points that went through identical
/// arithmetic hash the same; nearly-equal points don't.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct HashablePt2D {
    x_nan: NotNan<f64>,
    y_nan: NotNan<f64>,
}

impl HashablePt2D {
    /// NaN coordinates collapse to 0, so this never panics.
    pub fn new(x: f64, y: f64) -> HashablePt2D {
        let x = if x.is_nan() { 0.0 } else { x };
        let y = if y.is_nan() { 0.0 } else { y };
        HashablePt2D {
            x_nan: NotNan::new(x).unwrap(),
            y_nan: NotNan::new(y).unwrap(),
        }
    }

    pub fn to_pt2d(self) -> Pt2D {
        Pt2D::new(self.x_nan.into_inner(), self.y_nan.into_inner())
    }
}

impl From<Pt2D> for HashablePt2D {
    fn from(pt: Pt2D) -> Self {
        pt.to_hashable()
    }
}
