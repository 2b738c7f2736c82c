//! Simple polygons and polygons with holes
//!
//! Rings are stored closed (first vertex repeated at the end). Containment
//! is boundary-exclusive for `contains` and boundary-inclusive for
//! `contains_or_touches`; the overlap detector relies on that distinction.

use glam::DVec2;

use super::{AxisAlignedRectangle, LineSegmentXZ, POSITION_EPSILON};
use crate::error::GeometryError;

/// Closed, non-self-intersecting ring of at least three distinct vertices
#[derive(Debug, Clone, PartialEq)]
pub struct SimplePolygon {
    vertices: Vec<DVec2>,
}

impl SimplePolygon {
    /// Validate and close a ring. The closing vertex is optional in the input.
    pub fn new(vertices: Vec<DVec2>) -> Result<Self, GeometryError> {
        let polygon = Self::new_without_intersection_check(vertices)?;
        if polygon.is_self_intersecting() {
            return Err(GeometryError::SelfIntersecting);
        }
        Ok(polygon)
    }

    /// Like `new`, but trusts the caller that the ring is simple.
    /// Used for rings coming back from the clipping library.
    pub(crate) fn new_without_intersection_check(
        vertices: Vec<DVec2>,
    ) -> Result<Self, GeometryError> {
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }

        let mut ring: Vec<DVec2> = Vec::with_capacity(vertices.len() + 1);
        for v in vertices {
            match ring.last() {
                Some(last) if last.distance(v) <= POSITION_EPSILON => {}
                _ => ring.push(v),
            }
        }
        while ring.len() > 1 && ring[0].distance(ring[ring.len() - 1]) <= POSITION_EPSILON {
            ring.pop();
        }

        if ring.len() < 3 {
            return Err(GeometryError::TooFewVertices(ring.len()));
        }

        ring.push(ring[0]);
        let polygon = Self { vertices: ring };
        if polygon.signed_area().abs() < 1e-12 {
            return Err(GeometryError::ZeroArea);
        }
        Ok(polygon)
    }

    /// Closed vertex loop (first == last)
    pub fn vertices(&self) -> &[DVec2] {
        &self.vertices
    }

    /// Vertices without the closing duplicate
    pub fn distinct_vertices(&self) -> &[DVec2] {
        &self.vertices[..self.vertices.len() - 1]
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() - 1
    }

    pub fn segments(&self) -> impl Iterator<Item = LineSegmentXZ> + '_ {
        self.vertices.windows(2).map(|w| LineSegmentXZ::new(w[0], w[1]))
    }

    /// Shoelace area, positive for counter-clockwise rings
    pub fn signed_area(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|w| w[0].perp_dot(w[1]))
            .sum::<f64>()
            * 0.5
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_clockwise(&self) -> bool {
        self.signed_area() < 0.0
    }

    pub fn reversed(&self) -> Self {
        let mut vertices = self.vertices.clone();
        vertices.reverse();
        Self { vertices }
    }

    pub fn make_counter_clockwise(self) -> Self {
        if self.is_clockwise() {
            self.reversed()
        } else {
            self
        }
    }

    pub fn make_clockwise(self) -> Self {
        if self.is_clockwise() {
            self
        } else {
            self.reversed()
        }
    }

    pub fn bounds(&self) -> AxisAlignedRectangle {
        let mut bbox = AxisAlignedRectangle::new(
            self.vertices[0].x,
            self.vertices[0].y,
            self.vertices[0].x,
            self.vertices[0].y,
        );
        for v in &self.vertices[1..] {
            bbox.min_x = bbox.min_x.min(v.x);
            bbox.min_z = bbox.min_z.min(v.y);
            bbox.max_x = bbox.max_x.max(v.x);
            bbox.max_z = bbox.max_z.max(v.y);
        }
        bbox
    }

    /// Average of the distinct vertices
    pub fn center(&self) -> DVec2 {
        let distinct = self.distinct_vertices();
        distinct.iter().copied().sum::<DVec2>() / distinct.len() as f64
    }

    pub fn on_boundary(&self, p: DVec2) -> bool {
        self.segments().any(|s| s.touches(p))
    }

    /// Strict containment: points on the boundary are outside
    pub fn contains(&self, p: DVec2) -> bool {
        !self.on_boundary(p) && self.ray_cast(p)
    }

    pub fn contains_or_touches(&self, p: DVec2) -> bool {
        self.on_boundary(p) || self.ray_cast(p)
    }

    fn ray_cast(&self, p: DVec2) -> bool {
        let mut inside = false;
        for w in self.vertices.windows(2) {
            let (a, b) = (w[0], w[1]);
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Whether `other` lies within this polygon (shared boundary allowed)
    pub fn contains_polygon(&self, other: &SimplePolygon) -> bool {
        if !self.bounds().intersects(&other.bounds()) {
            return false;
        }
        other.distinct_vertices().iter().all(|&v| self.contains_or_touches(v))
            && other.segments().all(|s| self.contains_or_touches(s.center()))
            && !self.has_proper_crossing(other)
    }

    /// Any crossing of two edges away from both edges' endpoints
    fn has_proper_crossing(&self, other: &SimplePolygon) -> bool {
        other.segments().any(|s| {
            self.segments().any(|t| match s.intersection(&t) {
                Some(p) => !s.is_endpoint(p) && !t.is_endpoint(p),
                None => false,
            })
        })
    }

    /// Every point where `segment` meets the outline, duplicates removed
    pub fn intersections(&self, segment: &LineSegmentXZ) -> Vec<DVec2> {
        let mut result: Vec<DVec2> = Vec::new();
        for (_, p) in self.intersection_segments(segment) {
            if !result.iter().any(|q| q.distance(p) <= POSITION_EPSILON) {
                result.push(p);
            }
        }
        result
    }

    /// Outline segments crossed by `segment`, with the crossing point
    pub fn intersection_segments(&self, segment: &LineSegmentXZ) -> Vec<(LineSegmentXZ, DVec2)> {
        self.segments()
            .filter_map(|s| s.intersection(segment).map(|p| (s, p)))
            .collect()
    }

    /// Points where the two outlines meet, duplicates removed
    pub fn outline_intersections(&self, other: &SimplePolygon) -> Vec<DVec2> {
        let mut result: Vec<DVec2> = Vec::new();
        if !self.bounds().intersects(&other.bounds()) {
            return result;
        }
        for s in other.segments() {
            for p in self.intersections(&s) {
                if !result.iter().any(|q| q.distance(p) <= POSITION_EPSILON) {
                    result.push(p);
                }
            }
        }
        result
    }

    fn is_self_intersecting(&self) -> bool {
        let segments: Vec<LineSegmentXZ> = self.segments().collect();
        let n = segments.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                if adjacent {
                    continue;
                }
                if segments[i].intersection(&segments[j]).is_some() {
                    return true;
                }
            }
        }
        false
    }
}

/// Outer ring with holes. The outer ring is counter-clockwise, holes are clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonWithHoles {
    outer: SimplePolygon,
    holes: Vec<SimplePolygon>,
}

impl PolygonWithHoles {
    /// Normalizes ring orientation. Holes must lie inside `outer` and must
    /// not overlap each other; this is not re-checked here.
    pub fn new(outer: SimplePolygon, holes: Vec<SimplePolygon>) -> Self {
        Self {
            outer: outer.make_counter_clockwise(),
            holes: holes.into_iter().map(SimplePolygon::make_clockwise).collect(),
        }
    }

    pub fn outer(&self) -> &SimplePolygon {
        &self.outer
    }

    pub fn holes(&self) -> &[SimplePolygon] {
        &self.holes
    }

    pub fn rings(&self) -> impl Iterator<Item = &SimplePolygon> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    pub fn segments(&self) -> impl Iterator<Item = LineSegmentXZ> + '_ {
        self.rings().flat_map(|r| r.segments())
    }

    pub fn area(&self) -> f64 {
        self.outer.area() - self.holes.iter().map(SimplePolygon::area).sum::<f64>()
    }

    pub fn bounds(&self) -> AxisAlignedRectangle {
        self.outer.bounds()
    }

    pub fn on_boundary(&self, p: DVec2) -> bool {
        self.rings().any(|r| r.on_boundary(p))
    }

    /// Strict containment: points on any ring and points in holes are outside
    pub fn contains(&self, p: DVec2) -> bool {
        self.outer.contains(p) && !self.holes.iter().any(|h| h.contains_or_touches(p))
    }

    pub fn contains_or_touches(&self, p: DVec2) -> bool {
        self.outer.contains_or_touches(p) && !self.holes.iter().any(|h| h.contains(p))
    }

    pub fn intersections(&self, segment: &LineSegmentXZ) -> Vec<DVec2> {
        let mut result: Vec<DVec2> = Vec::new();
        for ring in self.rings() {
            for p in ring.intersections(segment) {
                if !result.iter().any(|q| q.distance(p) <= POSITION_EPSILON) {
                    result.push(p);
                }
            }
        }
        result
    }

    pub fn intersection_segments(&self, segment: &LineSegmentXZ) -> Vec<(LineSegmentXZ, DVec2)> {
        self.rings().flat_map(|r| r.intersection_segments(segment)).collect()
    }

    /// Points where any ring of `self` meets any ring of `other`
    pub fn outline_intersections(&self, other: &PolygonWithHoles) -> Vec<DVec2> {
        let mut result: Vec<DVec2> = Vec::new();
        for a in self.rings() {
            for b in other.rings() {
                for p in a.outline_intersections(b) {
                    if !result.iter().any(|q| q.distance(p) <= POSITION_EPSILON) {
                        result.push(p);
                    }
                }
            }
        }
        result
    }
}

impl From<SimplePolygon> for PolygonWithHoles {
    fn from(outer: SimplePolygon) -> Self {
        Self::new(outer, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, z: f64, size: f64) -> SimplePolygon {
        SimplePolygon::new(vec![
            DVec2::new(x, z),
            DVec2::new(x + size, z),
            DVec2::new(x + size, z + size),
            DVec2::new(x, z + size),
        ])
        .unwrap()
    }

    #[test]
    fn test_ring_is_closed_and_counted() {
        let p = square(0.0, 0.0, 2.0);
        assert_eq!(p.vertices().len(), 5);
        assert_eq!(p.vertex_count(), 4);
        assert_eq!(p.vertices()[0], p.vertices()[4]);
        assert!((p.signed_area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_rings_are_rejected() {
        let bowtie = SimplePolygon::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(2.0, 2.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(0.0, 1.0),
        ]);
        assert_eq!(bowtie, Err(GeometryError::SelfIntersecting));

        let line = SimplePolygon::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(2.0, 0.0),
        ]);
        assert_eq!(line, Err(GeometryError::ZeroArea));

        let two = SimplePolygon::new(vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0)]);
        assert_eq!(two, Err(GeometryError::TooFewVertices(2)));

        let nan = SimplePolygon::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(f64::NAN, 0.0),
            DVec2::new(0.0, 1.0),
        ]);
        assert_eq!(nan, Err(GeometryError::NonFinite));
    }

    #[test]
    fn test_contains_is_boundary_exclusive() {
        let p = square(0.0, 0.0, 2.0);
        assert!(p.contains(DVec2::new(1.0, 1.0)));
        assert!(!p.contains(DVec2::new(0.0, 1.0)));
        assert!(p.contains_or_touches(DVec2::new(0.0, 1.0)));
        assert!(!p.contains_or_touches(DVec2::new(3.0, 1.0)));
    }

    #[test]
    fn test_contains_polygon() {
        let big = square(0.0, 0.0, 10.0);
        let small = square(2.0, 2.0, 2.0);
        let crossing = square(8.0, 8.0, 4.0);
        assert!(big.contains_polygon(&small));
        assert!(!small.contains_polygon(&big));
        assert!(!big.contains_polygon(&crossing));
        // identical polygons contain each other
        assert!(big.contains_polygon(&square(0.0, 0.0, 10.0)));
    }

    #[test]
    fn test_polygon_with_holes_orientation_and_containment() {
        let outer = square(0.0, 0.0, 10.0).reversed();
        let hole = square(4.0, 4.0, 2.0);
        let p = PolygonWithHoles::new(outer, vec![hole]);
        assert!(!p.outer().is_clockwise());
        assert!(p.holes()[0].is_clockwise());
        assert!((p.area() - 96.0).abs() < 1e-9);
        assert!(p.contains(DVec2::new(1.0, 1.0)));
        assert!(!p.contains(DVec2::new(5.0, 5.0)));
        assert!(!p.contains(DVec2::new(4.0, 5.0)));
        assert!(p.contains_or_touches(DVec2::new(4.0, 5.0)));
    }

    #[test]
    fn test_segment_intersections() {
        let p = square(0.0, 0.0, 2.0);
        let s = LineSegmentXZ::new(DVec2::new(-1.0, 1.0), DVec2::new(3.0, 1.0));
        let hits = p.intersections(&s);
        assert_eq!(hits.len(), 2);
        assert_eq!(p.intersection_segments(&s).len(), 2);
    }
}
