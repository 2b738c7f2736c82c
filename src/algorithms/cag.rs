//! Constructive area geometry
//!
//! Boolean operations are delegated to `geo::BooleanOps`. Results are
//! converted back into normalized `PolygonWithHoles` values; rings that
//! collapse during clipping are dropped.

use std::panic::{self, AssertUnwindSafe};

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use glam::DVec2;

use crate::error::GeometryError;
use crate::math::{PolygonWithHoles, SimplePolygon};

/// Result polygons smaller than this are clipping noise
const MIN_RESULT_AREA: f64 = 1e-9;

/// Subtract every obstacle from `base`.
///
/// Returns all leftover regions, each with the holes the obstacles cut into
/// it. An empty obstacle list returns `base` unchanged; fully covering
/// obstacles return an empty list.
pub fn subtract_polygons(
    base: &PolygonWithHoles,
    obstacles: &[PolygonWithHoles],
) -> Result<Vec<PolygonWithHoles>, GeometryError> {
    if obstacles.is_empty() {
        return Ok(vec![base.clone()]);
    }

    let base_geo = MultiPolygon::new(vec![to_geo(base)]);
    let bounds = base.bounds();
    let relevant: Vec<Polygon<f64>> = obstacles
        .iter()
        .filter(|o| o.bounds().intersects(&bounds))
        .map(to_geo)
        .collect();

    if relevant.is_empty() {
        return Ok(vec![base.clone()]);
    }

    let result = run_clipping(|| {
        // overlapping obstacles are merged first so the difference sees one subject
        let merged = relevant.iter().fold(MultiPolygon::new(Vec::new()), |acc, p| {
            acc.union(&MultiPolygon::new(vec![p.clone()]))
        });
        base_geo.difference(&merged)
    })?;

    Ok(from_geo(&result))
}

/// Intersection of all polygons. An empty input yields an empty result.
pub fn intersect_polygons(
    polygons: &[PolygonWithHoles],
) -> Result<Vec<PolygonWithHoles>, GeometryError> {
    let Some((first, rest)) = polygons.split_first() else {
        return Ok(Vec::new());
    };

    let mut current = MultiPolygon::new(vec![to_geo(first)]);
    for polygon in rest {
        let other = MultiPolygon::new(vec![to_geo(polygon)]);
        current = run_clipping(|| current.intersection(&other))?;
        if current.0.is_empty() {
            break;
        }
    }

    Ok(from_geo(&current))
}

/// Run a clipping operation, turning a panic inside the library into an error
fn run_clipping<F>(op: F) -> Result<MultiPolygon<f64>, GeometryError>
where
    F: FnOnce() -> MultiPolygon<f64>,
{
    panic::catch_unwind(AssertUnwindSafe(op)).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown clipping failure".to_string());
        GeometryError::ClippingFailed(message)
    })
}

fn ring_to_geo(ring: &SimplePolygon) -> LineString<f64> {
    LineString::new(ring.vertices().iter().map(|v| Coord { x: v.x, y: v.y }).collect())
}

fn to_geo(polygon: &PolygonWithHoles) -> Polygon<f64> {
    Polygon::new(
        ring_to_geo(polygon.outer()),
        polygon.holes().iter().map(ring_to_geo).collect(),
    )
}

fn ring_from_geo(ring: &LineString<f64>) -> Result<SimplePolygon, GeometryError> {
    SimplePolygon::new_without_intersection_check(
        ring.coords().map(|c| DVec2::new(c.x, c.y)).collect(),
    )
}

fn from_geo(multi: &MultiPolygon<f64>) -> Vec<PolygonWithHoles> {
    multi
        .0
        .iter()
        .filter_map(|polygon| {
            let outer = ring_from_geo(polygon.exterior()).ok()?;
            let holes = polygon
                .interiors()
                .iter()
                .filter_map(|h| ring_from_geo(h).ok())
                .collect();
            let result = PolygonWithHoles::new(outer, holes);
            (result.area() > MIN_RESULT_AREA).then_some(result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x1: f64, z1: f64, x2: f64, z2: f64) -> PolygonWithHoles {
        SimplePolygon::new(vec![
            DVec2::new(x1, z1),
            DVec2::new(x2, z1),
            DVec2::new(x2, z2),
            DVec2::new(x1, z2),
        ])
        .unwrap()
        .into()
    }

    #[test]
    fn test_subtract_nothing_returns_base() {
        let base = rect(0.0, 0.0, 10.0, 10.0);
        let result = subtract_polygons(&base, &[]).unwrap();
        assert_eq!(result, vec![base]);
    }

    #[test]
    fn test_subtract_covering_obstacle_returns_empty() {
        let base = rect(0.0, 0.0, 10.0, 10.0);
        let result = subtract_polygons(&base, &[rect(-1.0, -1.0, 11.0, 11.0)]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_subtract_inner_obstacle_creates_hole() {
        let base = rect(0.0, 0.0, 10.0, 10.0);
        let result = subtract_polygons(&base, &[rect(4.0, 4.0, 6.0, 6.0)]).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes().len(), 1);
        assert!((result[0].area() - 96.0).abs() < 1e-6);
        assert!(!result[0].outer().is_clockwise());
        assert!(result[0].holes()[0].is_clockwise());
    }

    #[test]
    fn test_subtract_splitting_obstacle_returns_all_regions() {
        let base = rect(0.0, 0.0, 10.0, 10.0);
        let result = subtract_polygons(&base, &[rect(4.0, -1.0, 6.0, 11.0)]).unwrap();
        assert_eq!(result.len(), 2);
        let total: f64 = result.iter().map(PolygonWithHoles::area).sum();
        assert!((total - 80.0).abs() < 1e-6);
    }

    #[test]
    fn test_subtract_overlapping_obstacles() {
        let base = rect(0.0, 0.0, 10.0, 10.0);
        let obstacles = [rect(-1.0, -1.0, 6.0, 11.0), rect(4.0, -1.0, 8.0, 11.0)];
        let result = subtract_polygons(&base, &obstacles).unwrap();
        let total: f64 = result.iter().map(PolygonWithHoles::area).sum();
        assert!((total - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_intersect() {
        let result =
            intersect_polygons(&[rect(0.0, 0.0, 4.0, 4.0), rect(2.0, 2.0, 6.0, 6.0)]).unwrap();
        assert_eq!(result.len(), 1);
        assert!((result[0].area() - 4.0).abs() < 1e-6);

        let disjoint =
            intersect_polygons(&[rect(0.0, 0.0, 1.0, 1.0), rect(2.0, 2.0, 3.0, 3.0)]).unwrap();
        assert!(disjoint.is_empty());
        assert!(intersect_polygons(&[]).unwrap().is_empty());
    }
}
