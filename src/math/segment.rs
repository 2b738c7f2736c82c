use glam::DVec2;

use super::POSITION_EPSILON;

/// Straight line segment between two ground-plane positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegmentXZ {
    pub p1: DVec2,
    pub p2: DVec2,
}

impl LineSegmentXZ {
    pub fn new(p1: DVec2, p2: DVec2) -> Self {
        Self { p1, p2 }
    }

    pub fn length(&self) -> f64 {
        self.p1.distance(self.p2)
    }

    pub fn center(&self) -> DVec2 {
        (self.p1 + self.p2) * 0.5
    }

    pub fn direction(&self) -> DVec2 {
        (self.p2 - self.p1).normalize_or_zero()
    }

    /// Unit vector pointing to the right of the direction of travel
    pub fn right_normal(&self) -> DVec2 {
        let d = self.direction();
        DVec2::new(d.y, -d.x)
    }

    /// Intersection point of two segments, endpoints included.
    /// Parallel and collinear segments never intersect.
    pub fn intersection(&self, other: &LineSegmentXZ) -> Option<DVec2> {
        let r = self.p2 - self.p1;
        let s = other.p2 - other.p1;
        let denom = r.perp_dot(s);
        if denom.abs() < 1e-12 {
            return None;
        }
        let qp = other.p1 - self.p1;
        let t = qp.perp_dot(s) / denom;
        let u = qp.perp_dot(r) / denom;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(self.p1 + r * t)
        } else {
            None
        }
    }

    /// Distance from a point to the closest point of the segment
    pub fn distance_to(&self, p: DVec2) -> f64 {
        let d = self.p2 - self.p1;
        let len_sq = d.length_squared();
        if len_sq == 0.0 {
            return p.distance(self.p1);
        }
        let t = ((p - self.p1).dot(d) / len_sq).clamp(0.0, 1.0);
        p.distance(self.p1 + d * t)
    }

    /// Whether `p` lies on the segment (within `POSITION_EPSILON`)
    pub fn touches(&self, p: DVec2) -> bool {
        self.distance_to(p) <= POSITION_EPSILON
    }

    /// Whether `p` coincides with one of the endpoints
    pub fn is_endpoint(&self, p: DVec2) -> bool {
        p.distance(self.p1) <= POSITION_EPSILON || p.distance(self.p2) <= POSITION_EPSILON
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.p2, self.p1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x1: f64, z1: f64, x2: f64, z2: f64) -> LineSegmentXZ {
        LineSegmentXZ::new(DVec2::new(x1, z1), DVec2::new(x2, z2))
    }

    #[test]
    fn test_crossing_segments() {
        let p = seg(0.0, 0.0, 2.0, 2.0).intersection(&seg(0.0, 2.0, 2.0, 0.0)).unwrap();
        assert!(p.distance(DVec2::new(1.0, 1.0)) < 1e-12);
    }

    #[test]
    fn test_endpoints_are_inclusive() {
        let p = seg(0.0, 0.0, 1.0, 0.0).intersection(&seg(1.0, 0.0, 1.0, 1.0)).unwrap();
        assert!(p.distance(DVec2::new(1.0, 0.0)) < 1e-12);
    }

    #[test]
    fn test_parallel_segments_do_not_intersect() {
        assert!(seg(0.0, 0.0, 1.0, 0.0).intersection(&seg(0.0, 1.0, 1.0, 1.0)).is_none());
        assert!(seg(0.0, 0.0, 2.0, 0.0).intersection(&seg(1.0, 0.0, 3.0, 0.0)).is_none());
    }

    #[test]
    fn test_distance_to_point() {
        let s = seg(0.0, 0.0, 4.0, 0.0);
        assert!((s.distance_to(DVec2::new(2.0, 3.0)) - 3.0).abs() < 1e-12);
        assert!((s.distance_to(DVec2::new(7.0, 4.0)) - 5.0).abs() < 1e-12);
        assert!(s.touches(DVec2::new(1.5, 0.0)));
    }
}
