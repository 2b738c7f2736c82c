//! Pairwise overlap classification
//!
//! Dispatches on the pair of element kinds. Node/node and node/segment
//! pairs never overlap.

use glam::DVec2;

use super::types::{Overlap, OverlapKind};
use crate::error::GeometryError;
use crate::map_data::{AreaIdx, ElementRef, MapArea, MapData, NodeIdx, SegmentIdx};
use crate::math::{SimplePolygon, POSITION_EPSILON};

/// Fraction of a segment's length around its endpoints in which
/// segment/area intersections are treated as touches
const SEGMENT_END_TOLERANCE: f64 = 0.01;

/// Radius around shared nodes in which area/area intersections are ignored
const SHARED_NODE_TOLERANCE: f64 = 0.01;

/// Classify a pair of elements, `Ok(None)` if they do not overlap
pub fn classify(
    data: &MapData,
    a: ElementRef,
    b: ElementRef,
) -> Result<Option<Overlap>, GeometryError> {
    match (a, b) {
        (ElementRef::Segment(s1), ElementRef::Segment(s2)) => check_segment_segment(data, s1, s2),
        (ElementRef::Segment(s), ElementRef::Area(area))
        | (ElementRef::Area(area), ElementRef::Segment(s)) => check_segment_area(data, s, area),
        (ElementRef::Area(a1), ElementRef::Area(a2)) => check_area_area(data, a1, a2),
        (ElementRef::Node(n), ElementRef::Area(area))
        | (ElementRef::Area(area), ElementRef::Node(n)) => check_node_area(data, n, area),
        _ => Ok(None),
    }
}

fn ensure_finite(points: &[DVec2]) -> Result<(), GeometryError> {
    if points.iter().all(|p| p.is_finite()) {
        Ok(())
    } else {
        Err(GeometryError::NonFinite)
    }
}

fn check_segment_segment(
    data: &MapData,
    s1: SegmentIdx,
    s2: SegmentIdx,
) -> Result<Option<Overlap>, GeometryError> {
    let seg1 = data.segment(s1);
    let seg2 = data.segment(s2);

    // connected segments are adjacent, not overlapping
    if seg1.shares_node_with(seg2) {
        return Ok(None);
    }

    ensure_finite(&[seg1.segment.p1, seg1.segment.p2, seg2.segment.p1, seg2.segment.p2])?;

    let Some(p) = seg1.segment.intersection(&seg2.segment) else {
        return Ok(None);
    };

    // distinct nodes at the same position
    if seg1.segment.is_endpoint(p) && seg2.segment.is_endpoint(p) {
        return Ok(None);
    }

    let mut overlap = Overlap::new(
        ElementRef::Segment(s1),
        ElementRef::Segment(s2),
        OverlapKind::Intersect,
    );
    overlap.intersection_positions.push(p);
    Ok(Some(overlap))
}

fn check_segment_area(
    data: &MapData,
    s: SegmentIdx,
    a: AreaIdx,
) -> Result<Option<Overlap>, GeometryError> {
    let segment = data.segment(s);
    let area = data.area(a);
    let (e1, e2) = (ElementRef::Segment(s), ElementRef::Area(a));

    if area.has_boundary_segment(segment.start, segment.end) {
        return Ok(Some(Overlap::new(e1, e2, OverlapKind::ShareSegment)));
    }

    ensure_finite(&[segment.segment.p1, segment.segment.p2])?;

    let crossings = area.polygon.intersection_segments(&segment.segment);
    let tolerance = segment.segment.length() * SEGMENT_END_TOLERANCE;
    let away_from_ends = |p: DVec2| {
        p.distance(segment.segment.p1) > tolerance && p.distance(segment.segment.p2) > tolerance
    };

    if crossings.iter().any(|&(_, p)| away_from_ends(p)) {
        let mut overlap = Overlap::new(e1, e2, OverlapKind::Intersect);
        for &(_, p) in &crossings {
            if !overlap
                .intersection_positions
                .iter()
                .any(|q| q.distance(p) <= POSITION_EPSILON)
            {
                overlap.intersection_positions.push(p);
            }
        }
        overlap.intersecting_segments = crossings;
        return Ok(Some(overlap));
    }

    if area.polygon.contains(segment.segment.center()) {
        return Ok(Some(Overlap::new(e1, e2, OverlapKind::Contain)));
    }

    Ok(None)
}

fn check_area_area(
    data: &MapData,
    a1: AreaIdx,
    a2: AreaIdx,
) -> Result<Option<Overlap>, GeometryError> {
    let area1 = data.area(a1);
    let area2 = data.area(a2);
    let (e1, e2) = (ElementRef::Area(a1), ElementRef::Area(a2));

    if area1
        .boundary_node_pairs()
        .any(|(p, q)| area2.has_boundary_segment(p, q))
    {
        return Ok(Some(Overlap::new(e1, e2, OverlapKind::ShareSegment)));
    }

    // nodes used by both outlines, including distinct nodes at the same position
    let shared_positions: Vec<DVec2> = area1
        .polygon
        .rings()
        .flat_map(|r| r.distinct_vertices().iter().copied())
        .filter(|v| {
            area2
                .polygon
                .rings()
                .any(|r| r.distinct_vertices().iter().any(|w| w.distance(*v) <= POSITION_EPSILON))
        })
        .collect();

    let intersections: Vec<DVec2> = area1
        .polygon
        .outline_intersections(&area2.polygon)
        .into_iter()
        .filter(|p| {
            !shared_positions
                .iter()
                .any(|s| s.distance(*p) <= SHARED_NODE_TOLERANCE)
        })
        .collect();

    if !intersections.is_empty() {
        let mut overlap = Overlap::new(e1, e2, OverlapKind::Intersect);
        overlap.intersection_positions = intersections;
        return Ok(Some(overlap));
    }

    let outer1 = area1.polygon.outer();
    let outer2 = area2.polygon.outer();
    // a ring sitting inside a hole of the other area is not contained
    let in_hole = |container: &MapArea, inner: &SimplePolygon| {
        container.polygon.holes().iter().any(|h| h.contains_polygon(inner))
    };
    let contains1 = outer1.contains_polygon(outer2) && !in_hole(area1, outer2);
    let contains2 = outer2.contains_polygon(outer1) && !in_hole(area2, outer1);

    let contained_first = match (contains1, contains2) {
        (false, false) => return Ok(None),
        (true, false) => false,
        (false, true) => true,
        // identical outlines: the lower element id is the contained one
        (true, true) => (area1.id, a1) < (area2.id, a2),
    };

    let overlap = if contained_first {
        Overlap::new(e1, e2, OverlapKind::Contain)
    } else {
        Overlap::new(e2, e1, OverlapKind::Contain)
    };
    Ok(Some(overlap))
}

fn check_node_area(
    data: &MapData,
    n: NodeIdx,
    a: AreaIdx,
) -> Result<Option<Overlap>, GeometryError> {
    let pos = data.node_pos(n);
    ensure_finite(&[pos])?;

    if data.area(a).polygon.contains(pos) {
        Ok(Some(Overlap::new(
            ElementRef::Node(n),
            ElementRef::Area(a),
            OverlapKind::Contain,
        )))
    } else {
        Ok(None)
    }
}
