use serde::{Deserialize, Serialize};

use crate::pt::{cross, dot, is_zero};
use crate::{Angle, Bounds, Pt2D, EPSILON_DIST};

/// Segment, technically. Unlike a `Polygon`, nothing is validated; a zero-length line is
/// representable, and every query on one degrades gracefully.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line(Pt2D, Pt2D);

/// How a ray relates to a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RayHitType {
    /// The ray points away from the segment's line, or something is degenerate.
    None,
    Intersecting,
    /// The ray runs along the same infinite line as the segment.
    Colinear,
    Parallel,
}

/// The result of `Line::ray_test`. `pt` and the factors are only meaningful when the type is
/// `Intersecting`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub hit_type: RayHitType,
    pub pt: Pt2D,
    /// 0 is the segment's first point, 1 its second. Not clamped.
    pub factor_along_segment: f64,
    /// 0 is the ray origin, 1 the point the ray was aimed through. Never negative.
    pub factor_along_ray: f64,
}

impl RayHit {
    fn miss(hit_type: RayHitType, origin: Pt2D) -> RayHit {
        RayHit {
            hit_type,
            pt: origin,
            factor_along_segment: 0.0,
            factor_along_ray: 0.0,
        }
    }

    /// Does the ray cross the segment between its endpoints (inclusive)?
    pub fn within_segment(&self) -> bool {
        self.hit_type == RayHitType::Intersecting
            && self.factor_along_segment >= 0.0
            && self.factor_along_segment <= 1.0
    }
}

impl Line {
    pub fn new(pt1: Pt2D, pt2: Pt2D) -> Line {
        Line(pt1, pt2)
    }

    pub fn pt1(&self) -> Pt2D {
        self.0
    }

    pub fn pt2(&self) -> Pt2D {
        self.1
    }

    pub fn length(&self) -> f64 {
        self.0.dist_to(self.1)
    }

    pub fn angle(&self) -> Angle {
        self.0.angle_to(self.1)
    }

    pub fn reversed(&self) -> Line {
        Line(self.1, self.0)
    }

    pub fn middle(&self) -> Pt2D {
        self.0.lerp(self.1, 0.5)
    }

    /// The point `pct` of the way along; values outside [0, 1] extrapolate.
    pub fn percent_along(&self, pct: f64) -> Pt2D {
        self.0.lerp(self.1, pct)
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&[self.0, self.1])
    }

    fn is_degenerate(&self) -> bool {
        is_zero(self.1.minus(self.0))
    }

    /// Where two segments cross. Parallel and colinear segments never produce a point. If
    /// `include_endpoints` is false, touching exactly at either segment's endpoint doesn't count.
    pub fn intersection(&self, other: &Line, include_endpoints: bool) -> Option<Pt2D> {
        if self.is_degenerate() || other.is_degenerate() {
            return None;
        }
        let r = self.1.minus(self.0);
        let s = other.1.minus(other.0);
        let denom = cross(r, s);
        if denom.abs() <= f64::EPSILON * self.length() * other.length() {
            return None;
        }
        let qp = other.0.minus(self.0);
        let t = cross(qp, s) / denom;
        let u = cross(qp, r) / denom;

        let within = |x: f64| {
            if include_endpoints {
                (0.0..=1.0).contains(&x)
            } else {
                x > 0.0 && x < 1.0
            }
        };
        if within(t) && within(u) {
            Some(self.percent_along(t))
        } else {
            None
        }
    }

    pub fn intersects(&self, other: &Line, include_endpoints: bool) -> bool {
        self.intersection(other, include_endpoints).is_some()
    }

    /// Test a ray against this segment. The ray starts at `ray.pt1()` and heads through
    /// `ray.pt2()`, continuing forever. The segment's bounds aren't enforced here; check
    /// `factor_along_segment` (or `within_segment`).
    pub fn ray_test(&self, ray: &Line) -> RayHit {
        let origin = ray.pt1();
        if self.is_degenerate() || ray.is_degenerate() {
            return RayHit::miss(RayHitType::None, origin);
        }
        let r = self.1.minus(self.0);
        let d = ray.pt2().minus(origin);
        let op = origin.minus(self.0);
        let denom = cross(r, d);
        if denom.abs() <= 1e-9 * self.length() * ray.length() {
            // Distance from the ray origin to the segment's infinite line
            let off_line = cross(op, r).abs() / self.length();
            if off_line < EPSILON_DIST {
                return RayHit::miss(RayHitType::Colinear, origin);
            }
            return RayHit::miss(RayHitType::Parallel, origin);
        }

        let factor_along_segment = cross(op, d) / denom;
        let factor_along_ray = cross(op, r) / denom;
        if factor_along_ray < 0.0 {
            return RayHit::miss(RayHitType::None, origin);
        }
        RayHit {
            hit_type: RayHitType::Intersecting,
            pt: ray.percent_along(factor_along_ray),
            factor_along_segment,
            factor_along_ray,
        }
    }

    /// Project a point onto this segment. With `clamp`, the result is the closest point on the
    /// segment. Without, projections landing beyond either end produce `None`.
    pub fn project_pt(&self, pt: Pt2D, clamp: bool) -> Option<Pt2D> {
        let r = self.1.minus(self.0);
        let len_sq = dot(r, r);
        if len_sq < EPSILON_DIST * EPSILON_DIST {
            return if clamp { Some(self.0) } else { None };
        }
        let t = dot(pt.minus(self.0), r) / len_sq;
        if clamp {
            Some(self.percent_along(t.clamp(0.0, 1.0)))
        } else if (0.0..=1.0).contains(&t) {
            Some(self.percent_along(t))
        } else {
            None
        }
    }

    /// Distance from a point to the closest point on the segment.
    pub fn dist_to_pt(&self, pt: Pt2D) -> f64 {
        match self.project_pt(pt, true) {
            Some(proj) => proj.dist_to(pt),
            None => self.0.dist_to(pt),
        }
    }

    /// Is the point on the segment, within `EPSILON_DIST`?
    pub fn contains_pt(&self, pt: Pt2D) -> bool {
        self.dist_to_pt(pt) < EPSILON_DIST
    }
}
