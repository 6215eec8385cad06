use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Bounds, Line, Pt2D, EPSILON_DIST};

/// How far past the rightmost vertex the containment test casts its ray.
const RAY_MARGIN: f64 = 10.0;

/// A simple polygon, stored as a ring of points. The first point isn't repeated at the end.
/// Nothing is validated on construction; use `is_simple` before trusting the shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Pt2D>,
}

impl Polygon {
    /// If the caller passes a closed ring (first point equal to the last), the repeat is dropped.
    pub fn new(mut points: Vec<Pt2D>) -> Polygon {
        if points.len() > 1 && points[0] == *points.last().unwrap() {
            points.pop();
        }
        Polygon { points }
    }

    pub fn rectangle(min: Pt2D, max: Pt2D) -> Polygon {
        Polygon::new(Bounds::from(&[min, max]).get_corners())
    }

    pub fn points(&self) -> &Vec<Pt2D> {
        &self.points
    }

    pub fn into_points(self) -> Vec<Pt2D> {
        self.points
    }

    pub fn get_bounds(&self) -> Bounds {
        Bounds::from(&self.points)
    }

    /// Every side, including the closing one.
    pub fn lines(&self) -> Vec<Line> {
        let n = self.points.len();
        if n < 2 {
            return Vec::new();
        }
        (0..n)
            .map(|i| Line::new(self.points[i], self.points[(i + 1) % n]))
            .collect()
    }

    /// Shoelace formula. Positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            sum += a.x() * b.y() - b.x() * a.y();
        }
        sum / 2.0
    }

    /// Never negative.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_clockwise(&self) -> bool {
        self.signed_area() < 0.0
    }

    /// The area-weighted centroid. Degenerate polygons fall back to the average of the points.
    pub fn center(&self) -> Pt2D {
        let area = self.signed_area();
        if area.abs() < EPSILON_DIST {
            return Pt2D::center(&self.points);
        }
        let n = self.points.len();
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            let f = a.x() * b.y() - b.x() * a.y();
            cx += (a.x() + b.x()) * f;
            cy += (a.y() + b.y()) * f;
        }
        Pt2D::new(cx / (6.0 * area), cy / (6.0 * area))
    }

    /// Ray casting. A ray leaves `pt` heading towards a point just past the rightmost vertex;
    /// the point is inside if it crosses an odd number of sides. Sides are treated as half-open
    /// in y, so a ray passing exactly through a vertex is counted once.
    pub fn contains_pt(&self, pt: Pt2D) -> bool {
        if self.points.len() < 3 {
            return false;
        }
        let max_x = self
            .points
            .iter()
            .map(|p| p.x())
            .fold(f64::MIN, f64::max);
        let far_x = max_x + RAY_MARGIN;
        if pt.x() > far_x {
            return false;
        }

        let mut inside = false;
        for side in self.lines() {
            let (a, b) = (side.pt1(), side.pt2());
            if (a.y() > pt.y()) != (b.y() > pt.y()) {
                let cross_x = a.x() + (pt.y() - a.y()) / (b.y() - a.y()) * (b.x() - a.x());
                if cross_x >= pt.x() && cross_x <= far_x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// No side crosses or touches a non-adjacent side, no point repeats, and there's some area.
    pub fn is_simple(&self) -> bool {
        let n = self.points.len();
        if n < 3 || self.area() < EPSILON_DIST {
            return false;
        }
        if self.has_repeat_points() {
            return false;
        }
        let lines = self.lines();
        for i in 0..n {
            for j in (i + 1)..n {
                // Adjacent sides always share a point
                if j == i + 1 || (i == 0 && j == n - 1) {
                    continue;
                }
                if lines[i].intersects(&lines[j], true) {
                    return false;
                }
            }
        }
        true
    }

    pub fn has_repeat_points(&self) -> bool {
        let mut seen = HashSet::new();
        for pt in &self.points {
            if !seen.insert(pt.to_hashable()) {
                return true;
            }
        }
        false
    }
}

impl fmt::Display for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Polygon::new(vec![")?;
        for pt in &self.points {
            writeln!(f, "  Pt2D::new({}, {}),", pt.x(), pt.y())?;
        }
        write!(f, "])")
    }
}
