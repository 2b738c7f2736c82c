use glam::{DVec2, DVec3};

use super::{xyz, POSITION_EPSILON};

/// Area below which a triangle counts as degenerate
const DEGENERATE_AREA: f64 = 1e-9;

/// Triangle on the ground plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleXZ {
    pub v1: DVec2,
    pub v2: DVec2,
    pub v3: DVec2,
}

impl TriangleXZ {
    pub fn new(v1: DVec2, v2: DVec2, v3: DVec2) -> Self {
        Self { v1, v2, v3 }
    }

    pub fn vertices(&self) -> [DVec2; 3] {
        [self.v1, self.v2, self.v3]
    }

    /// Positive for counter-clockwise triangles
    pub fn signed_area(&self) -> f64 {
        (self.v2 - self.v1).perp_dot(self.v3 - self.v1) * 0.5
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn center(&self) -> DVec2 {
        (self.v1 + self.v2 + self.v3) / 3.0
    }

    pub fn has_coincident_vertices(&self) -> bool {
        self.v1.distance(self.v2) <= POSITION_EPSILON
            || self.v2.distance(self.v3) <= POSITION_EPSILON
            || self.v3.distance(self.v1) <= POSITION_EPSILON
    }

    pub fn is_degenerate_or_nan(&self) -> bool {
        !(self.v1.is_finite() && self.v2.is_finite() && self.v3.is_finite())
            || self.area() < DEGENERATE_AREA
    }

    pub fn make_counter_clockwise(self) -> Self {
        if self.signed_area() < 0.0 {
            Self::new(self.v1, self.v3, self.v2)
        } else {
            self
        }
    }

    /// Lift to 3D using an elevation lookup for each vertex
    pub fn to_xyz(&self, ele: impl Fn(DVec2) -> f64) -> TriangleXYZ {
        TriangleXYZ::new(
            xyz(self.v1, ele(self.v1)),
            xyz(self.v2, ele(self.v2)),
            xyz(self.v3, ele(self.v3)),
        )
    }
}

/// Triangle in scene space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleXYZ {
    pub v1: DVec3,
    pub v2: DVec3,
    pub v3: DVec3,
}

impl TriangleXYZ {
    pub fn new(v1: DVec3, v2: DVec3, v3: DVec3) -> Self {
        Self { v1, v2, v3 }
    }

    pub fn vertices(&self) -> [DVec3; 3] {
        [self.v1, self.v2, self.v3]
    }

    /// Unit normal. Triangles that are counter-clockwise on the ground plane face +y.
    pub fn normal(&self) -> DVec3 {
        (self.v3 - self.v1).cross(self.v2 - self.v1).normalize_or_zero()
    }

    pub fn area(&self) -> f64 {
        (self.v2 - self.v1).cross(self.v3 - self.v1).length() * 0.5
    }

    pub fn center(&self) -> DVec3 {
        (self.v1 + self.v2 + self.v3) / 3.0
    }

    pub fn shift(&self, offset: DVec3) -> Self {
        Self::new(self.v1 + offset, self.v2 + offset, self.v3 + offset)
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.v1, self.v3, self.v2)
    }

    pub fn is_degenerate_or_nan(&self) -> bool {
        !(self.v1.is_finite() && self.v2.is_finite() && self.v3.is_finite())
            || self.area() < DEGENERATE_AREA
    }
}
