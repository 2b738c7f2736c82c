use glam::DVec2;

use super::SimplePolygon;

/// Axis-aligned rectangle on the ground plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAlignedRectangle {
    pub min_x: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_z: f64,
}

impl AxisAlignedRectangle {
    pub fn new(min_x: f64, min_z: f64, max_x: f64, max_z: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_z: min_z.min(max_z),
            max_x: min_x.max(max_x),
            max_z: min_z.max(max_z),
        }
    }

    /// Smallest rectangle containing all points, `None` for an empty iterator
    pub fn from_points<I: IntoIterator<Item = DVec2>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first.x, first.y, first.x, first.y);
        for p in iter {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_z = bbox.min_z.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_z = bbox.max_z.max(p.y);
        }
        Some(bbox)
    }

    pub fn size_x(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn size_z(&self) -> f64 {
        self.max_z - self.min_z
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_z + self.max_z) * 0.5,
        )
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_z: self.min_z.min(other.min_z),
            max_x: self.max_x.max(other.max_x),
            max_z: self.max_z.max(other.max_z),
        }
    }

    /// Grow the rectangle by `amount` on every side
    pub fn pad(&self, amount: f64) -> Self {
        Self::new(
            self.min_x - amount,
            self.min_z - amount,
            self.max_x + amount,
            self.max_z + amount,
        )
    }

    /// Closed-interval overlap test (touching rectangles intersect)
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_z <= other.max_z
            && other.min_z <= self.max_z
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_z && p.y <= self.max_z
    }

    /// Counter-clockwise outline, `None` if the rectangle has no area
    pub fn to_polygon(&self) -> Option<SimplePolygon> {
        SimplePolygon::new(vec![
            DVec2::new(self.min_x, self.min_z),
            DVec2::new(self.max_x, self.min_z),
            DVec2::new(self.max_x, self.max_z),
            DVec2::new(self.min_x, self.max_z),
        ])
        .ok()
    }
}
