use rstar::AABB;
use serde::{Deserialize, Serialize};

use crate::Pt2D;

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// A boundary including no points.
    pub fn new() -> Bounds {
        Bounds {
            min_x: f64::MAX,
            min_y: f64::MAX,
            max_x: f64::MIN,
            max_y: f64::MIN,
        }
    }

    pub fn from(pts: &[Pt2D]) -> Bounds {
        let mut b = Bounds::new();
        for pt in pts {
            b.update(*pt);
        }
        b
    }

    /// A box from (0, 0) to (width, height).
    pub fn from_size(width: f64, height: f64) -> Bounds {
        Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: width,
            max_y: height,
        }
    }

    /// The square of `radius` around a point.
    pub fn around(center: Pt2D, radius: f64) -> Bounds {
        let mut b = Bounds::from(&[center]);
        b.expand(radius);
        b
    }

    /// Update the boundary to include this point.
    pub fn update(&mut self, pt: Pt2D) {
        self.min_x = self.min_x.min(pt.x());
        self.max_x = self.max_x.max(pt.x());
        self.min_y = self.min_y.min(pt.y());
        self.max_y = self.max_y.max(pt.y());
    }

    /// Expand the boundary to include another.
    pub fn union(&mut self, other: Bounds) {
        if other.is_empty() {
            return;
        }
        self.update(Pt2D::new(other.min_x, other.min_y));
        self.update(Pt2D::new(other.max_x, other.max_y));
    }

    /// Grow on every side by `dist`.
    pub fn expand(&mut self, dist: f64) {
        if self.is_empty() {
            return;
        }
        self.min_x -= dist;
        self.min_y -= dist;
        self.max_x += dist;
        self.max_y += dist;
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// True if the point is within the boundary, edges included.
    pub fn contains(&self, pt: Pt2D) -> bool {
        pt.x() >= self.min_x && pt.x() <= self.max_x && pt.y() >= self.min_y && pt.y() <= self.max_y
    }

    /// True if the two boxes share any area, or touch.
    pub fn overlaps(&self, other: &Bounds) -> bool {
        !(self.is_empty()
            || other.is_empty()
            || self.max_x < other.min_x
            || other.max_x < self.min_x
            || self.max_y < other.min_y
            || other.max_y < self.min_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Pt2D {
        Pt2D::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn get_corners(&self) -> Vec<Pt2D> {
        vec![
            Pt2D::new(self.min_x, self.min_y),
            Pt2D::new(self.max_x, self.min_y),
            Pt2D::new(self.max_x, self.max_y),
            Pt2D::new(self.min_x, self.max_y),
        ]
    }

    /// The envelope an R-tree understands.
    pub fn to_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }

    pub fn from_aabb(aabb: &AABB<[f64; 2]>) -> Bounds {
        let lower = aabb.lower();
        let upper = aabb.upper();
        Bounds {
            min_x: lower[0],
            min_y: lower[1],
            max_x: upper[0],
            max_y: upper[1],
        }
    }
}

impl Default for Bounds {
    fn default() -> Bounds {
        Bounds::new()
    }
}
