//! Plain 2D geometry for growing road networks. Everything here lives on the ground plane; the
//! y coordinate of a `Pt2D` is the world's z axis. Nothing in this crate panics on degenerate
//! input. Parallel lines and zero-length segments come back as `None` or `RayHitType::None`, and
//! callers are expected to check.

mod angle;
mod bounds;
mod line;
mod polygon;
mod pt;

pub use crate::angle::Angle;
pub use crate::bounds::Bounds;
pub use crate::line::{Line, RayHit, RayHitType};
pub use crate::polygon::Polygon;
pub use crate::pt::{HashablePt2D, Pt2D};

/// Distances below this are treated as zero.
pub const EPSILON_DIST: f64 = 1e-6;

/// Compare two floats with an absolute tolerance.
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}
