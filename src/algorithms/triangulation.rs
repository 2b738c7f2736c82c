//! Polygon triangulation using the earcut algorithm
//!
//! Outer ring and holes go through earcut as a flat coordinate buffer with
//! explicit hole start indices. Interior points are inserted afterwards: a
//! point inside a triangle splits it into three, a point on an inner edge
//! splits both adjacent triangles into two. Either way each point adds two
//! triangles, so the result has `n + Σh + 2H + 2P - 2` triangles.

use std::collections::HashMap;

use glam::DVec2;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use crate::error::GeometryError;
use crate::math::{PolygonWithHoles, SimplePolygon, TriangleXZ, POSITION_EPSILON};

/// Distance from an edge below which an interior point counts as lying on it
const EDGE_TOLERANCE: f64 = 1e-7;

type IndexedTriangle = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Triangulate a polygon with holes, optionally honoring interior points.
///
/// Returned triangles are counter-clockwise and carry positions rather than
/// indices. Triangles with coincident vertices and degenerate or NaN
/// triangles are removed. Interior points outside the polygon (or inside a
/// hole, or on a vertex) are ignored.
pub fn triangulate(
    polygon: &SimplePolygon,
    holes: &[SimplePolygon],
    points: &[DVec2],
) -> Result<Vec<TriangleXZ>, GeometryError> {
    let mut positions: Vec<DVec2> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();

    positions.extend_from_slice(polygon.distinct_vertices());

    for hole in holes {
        hole_indices.push(positions.len());
        positions.extend_from_slice(hole.distinct_vertices());
    }

    let flat_coords: Vec<f64> = positions.iter().flat_map(|p| [p.x, p.y]).collect();

    let indices = earcutr::earcut(&flat_coords, &hole_indices, 2)
        .map_err(|e| GeometryError::TriangulationFailed(format!("{:?}", e)))?;

    let triangles: Vec<[usize; 3]> = indices
        .chunks_exact(3)
        .filter_map(|tri| {
            let [a, b, c] = [tri[0], tri[1], tri[2]];
            let triangle = TriangleXZ::new(positions[a], positions[b], positions[c]);
            if triangle.has_coincident_vertices() || triangle.is_degenerate_or_nan() {
                None
            } else if triangle.signed_area() < 0.0 {
                Some([a, c, b])
            } else {
                Some([a, b, c])
            }
        })
        .collect();

    if points.is_empty() {
        return Ok(to_triangles(&positions, &triangles));
    }

    let mut known: RTree<[f64; 2]> =
        RTree::bulk_load(positions.iter().map(|p| [p.x, p.y]).collect());
    let mut mesh = TriangleMesh::new(positions, triangles);

    for &p in points {
        let usable = polygon.contains(p)
            && !holes.iter().any(|h| h.contains_or_touches(p))
            && known
                .locate_within_distance([p.x, p.y], POSITION_EPSILON * POSITION_EPSILON)
                .next()
                .is_none();
        if usable && mesh.insert_point(p) {
            known.insert([p.x, p.y]);
        }
    }

    Ok(to_triangles(&mesh.positions, &mesh.triangles))
}

fn to_triangles(positions: &[DVec2], triangles: &[[usize; 3]]) -> Vec<TriangleXZ> {
    triangles
        .iter()
        .map(|&[a, b, c]| TriangleXZ::new(positions[a], positions[b], positions[c]))
        .filter(|t| !t.has_coincident_vertices() && !t.is_degenerate_or_nan())
        .map(TriangleXZ::make_counter_clockwise)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PointLocation {
    Inside,
    /// On the edge starting at the given corner
    OnEdge(usize),
}

/// Counter-clockwise index triangles with edge adjacency and a spatial index
struct TriangleMesh {
    positions: Vec<DVec2>,
    triangles: Vec<[usize; 3]>,
    /// directed edge -> triangle slot
    edges: HashMap<(usize, usize), usize>,
    index: RTree<IndexedTriangle>,
}

impl TriangleMesh {
    fn new(positions: Vec<DVec2>, triangles: Vec<[usize; 3]>) -> Self {
        let mut mesh = Self {
            positions,
            triangles: Vec::with_capacity(triangles.len()),
            edges: HashMap::new(),
            index: RTree::new(),
        };
        let indexed: Vec<IndexedTriangle> = triangles
            .into_iter()
            .map(|tri| {
                let slot = mesh.triangles.len();
                mesh.triangles.push(tri);
                mesh.register_edges(slot);
                mesh.envelope(slot)
            })
            .collect();
        mesh.index = RTree::bulk_load(indexed);
        mesh
    }

    fn envelope(&self, slot: usize) -> IndexedTriangle {
        let [a, b, c] = self.triangles[slot].map(|i| self.positions[i]);
        let min = a.min(b).min(c);
        let max = a.max(b).max(c);
        GeomWithData::new(Rectangle::from_corners([min.x, min.y], [max.x, max.y]), slot)
    }

    fn register_edges(&mut self, slot: usize) {
        let [a, b, c] = self.triangles[slot];
        for edge in [(a, b), (b, c), (c, a)] {
            self.edges.insert(edge, slot);
        }
    }

    fn replace(&mut self, slot: usize, tri: [usize; 3]) {
        let old = self.envelope(slot);
        self.index.remove(&old);
        self.triangles[slot] = tri;
        self.register_edges(slot);
        let envelope = self.envelope(slot);
        self.index.insert(envelope);
    }

    fn push(&mut self, tri: [usize; 3]) {
        let slot = self.triangles.len();
        self.triangles.push(tri);
        self.register_edges(slot);
        let envelope = self.envelope(slot);
        self.index.insert(envelope);
    }

    fn locate(&self, slot: usize, p: DVec2) -> Option<PointLocation> {
        let corners = self.triangles[slot].map(|i| self.positions[i]);
        let mut on_edge = None;
        for k in 0..3 {
            let (a, b) = (corners[k], corners[(k + 1) % 3]);
            let distance = (b - a).perp_dot(p - a) / a.distance(b);
            if distance < -EDGE_TOLERANCE {
                return None;
            }
            if distance <= EDGE_TOLERANCE {
                if on_edge.is_some() {
                    // on a corner
                    return None;
                }
                on_edge = Some(k);
            }
        }
        Some(on_edge.map_or(PointLocation::Inside, PointLocation::OnEdge))
    }

    /// Adds `p` as a vertex. Returns false if no triangle contains it.
    fn insert_point(&mut self, p: DVec2) -> bool {
        let search = AABB::from_corners(
            [p.x - EDGE_TOLERANCE, p.y - EDGE_TOLERANCE],
            [p.x + EDGE_TOLERANCE, p.y + EDGE_TOLERANCE],
        );
        let candidates: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&search)
            .map(|t| t.data)
            .collect();

        let mut edge_hit = None;
        let mut inside_hit = None;
        for slot in candidates {
            match self.locate(slot, p) {
                Some(PointLocation::Inside) => {
                    inside_hit = Some(slot);
                    break;
                }
                Some(PointLocation::OnEdge(k)) => {
                    edge_hit.get_or_insert((slot, k));
                }
                None => {}
            }
        }

        let i = self.positions.len();
        if let Some(slot) = inside_hit {
            self.positions.push(p);
            self.split_inside(slot, i);
        } else if let Some((slot, k)) = edge_hit {
            self.positions.push(p);
            self.split_edge(slot, k, i);
        } else {
            return false;
        }
        true
    }

    fn split_inside(&mut self, slot: usize, i: usize) {
        let [a, b, c] = self.triangles[slot];
        self.replace(slot, [a, b, i]);
        self.push([b, c, i]);
        self.push([c, a, i]);
    }

    fn split_edge(&mut self, slot: usize, k: usize, i: usize) {
        let tri = self.triangles[slot];
        let (u, v, w) = (tri[k], tri[(k + 1) % 3], tri[(k + 2) % 3]);
        self.edges.remove(&(u, v));
        let neighbor = self.edges.remove(&(v, u));

        self.replace(slot, [u, i, w]);
        self.push([i, v, w]);

        if let Some(n) = neighbor {
            let other = self.triangles[n];
            let Some(start) = other.iter().position(|&x| x == v) else {
                return;
            };
            let x = other[(start + 2) % 3];
            self.replace(n, [v, i, x]);
            self.push([i, u, x]);
        }
    }
}

/// Convenience wrapper for `PolygonWithHoles`
pub fn triangulate_polygon(
    polygon: &PolygonWithHoles,
    points: &[DVec2],
) -> Result<Vec<TriangleXZ>, GeometryError> {
    triangulate(polygon.outer(), polygon.holes(), points)
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

    fn total_area(triangles: &[TriangleXZ]) -> f64 {
        triangles.iter().map(TriangleXZ::area).sum()
    }

    #[test]
    fn test_simple_polygon_yields_n_minus_two() {
        let hexagon = SimplePolygon::new(
            (0..6)
                .map(|i| {
                    let a = i as f64 * std::f64::consts::PI / 3.0;
                    DVec2::new(a.cos() * 5.0, a.sin() * 5.0)
                })
                .collect(),
        )
        .unwrap();
        let triangles = triangulate(&hexagon, &[], &[]).unwrap();
        assert_eq!(triangles.len(), 4);
        assert!((total_area(&triangles) - hexagon.area()).abs() < 1e-9);
        assert!(triangles.iter().all(|t| !t.is_degenerate_or_nan()));
        assert!(triangles.iter().all(|t| t.signed_area() > 0.0));
    }

    #[test]
    fn test_polygon_with_hole() {
        let outer = square(0.0, 0.0, 10.0);
        let hole = square(3.0, 4.0, 2.0).make_clockwise();
        let triangles = triangulate(&outer, &[hole.clone()], &[]).unwrap();
        // n + h + 2H - 2
        assert_eq!(triangles.len(), 4 + 4 + 2 - 2);
        assert!((total_area(&triangles) - 96.0).abs() < 1e-9);
        assert!(triangles.iter().all(|t| !hole.contains(t.center())));
    }

    fn uses_vertex(triangles: &[TriangleXZ], p: DVec2) -> bool {
        triangles.iter().any(|t| t.vertices().contains(&p))
    }

    #[test]
    fn test_interior_point_keeps_area_and_vertices() {
        let outer = square(0.0, 0.0, 10.0);
        let point = DVec2::new(3.0, 4.0);
        let triangles = triangulate(&outer, &[], &[point]).unwrap();
        assert_eq!(triangles.len(), 4);
        assert!(triangles.iter().all(|t| !t.is_degenerate_or_nan()));
        assert!((total_area(&triangles) - 100.0).abs() < 1e-9);
        assert!(uses_vertex(&triangles, point));
        for t in &triangles {
            for v in t.vertices() {
                assert!(outer.distinct_vertices().contains(&v) || v == point);
            }
        }
    }

    #[test]
    fn test_several_interior_points_all_become_vertices() {
        let outer = square(0.0, 0.0, 100.0);
        let points = [
            DVec2::new(20.0, 30.0),
            DVec2::new(70.0, 15.0),
            DVec2::new(45.0, 80.0),
            DVec2::new(85.0, 60.0),
            DVec2::new(10.0, 90.0),
        ];
        let triangles = triangulate(&outer, &[], &points).unwrap();
        assert_eq!(triangles.len(), 4 + 2 * points.len() - 2);
        assert!(points.iter().all(|&p| uses_vertex(&triangles, p)));
        assert!((total_area(&triangles) - 10000.0).abs() < 1e-6);
        assert!(triangles.iter().all(|t| t.signed_area() > 0.0));
    }

    #[test]
    fn test_point_grid_on_shared_edges() {
        let outer = square(0.0, 0.0, 100.0);
        // many of these lie on the diagonal and on edges created by earlier points
        let points: Vec<DVec2> = (1..20)
            .flat_map(|i| (1..20).map(move |j| DVec2::new(i as f64 * 5.0, j as f64 * 5.0)))
            .collect();
        let triangles = triangulate(&outer, &[], &points).unwrap();
        assert_eq!(triangles.len(), 4 + 2 * 361 - 2);
        assert!(points.iter().all(|&p| uses_vertex(&triangles, p)));
        assert!((total_area(&triangles) - 10000.0).abs() < 1e-6);
        assert!(triangles.iter().all(|t| !t.is_degenerate_or_nan()));
    }

    #[test]
    fn test_points_with_hole() {
        let outer = square(0.0, 0.0, 10.0);
        let hole = square(4.0, 4.0, 2.0).make_clockwise();
        let points = [
            DVec2::new(1.0, 1.0),
            DVec2::new(8.0, 2.0),
            DVec2::new(5.0, 5.0),
            DVec2::new(2.0, 8.0),
        ];
        let triangles = triangulate(&outer, &[hole.clone()], &points).unwrap();
        // the point inside the hole is dropped
        assert_eq!(triangles.len(), 4 + 4 + 2 - 2 + 2 * 3);
        assert!(!uses_vertex(&triangles, DVec2::new(5.0, 5.0)));
        assert!((total_area(&triangles) - 96.0).abs() < 1e-9);
        assert!(triangles.iter().all(|t| !hole.contains(t.center())));
    }

    #[test]
    fn test_duplicate_points_are_inserted_once() {
        let outer = square(0.0, 0.0, 10.0);
        let p = DVec2::new(2.0, 3.0);
        let triangles = triangulate(&outer, &[], &[p, p, DVec2::new(0.0, 0.0)]).unwrap();
        assert_eq!(triangles.len(), 4);
    }

    #[test]
    fn test_points_outside_are_ignored() {
        let outer = square(0.0, 0.0, 10.0);
        let triangles =
            triangulate(&outer, &[], &[DVec2::new(20.0, 20.0), DVec2::new(0.0, 0.0)]).unwrap();
        assert_eq!(triangles.len(), 2);
    }
}
