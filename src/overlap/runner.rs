//! Overlap detection over a complete `MapData`

use std::time::Instant;

use rayon::prelude::*;

use super::checks;
use super::grid::IndexGrid;
use crate::conversion::ConversionLog;
use crate::map_data::{ElementRef, MapData};

/// Padding around the data boundary for the overlap grid
const GRID_PADDING: f64 = 10.0;

/// Find all overlaps between elements and attach each to both participants.
/// Returns the number of overlaps added.
///
/// Pairs whose classification fails are logged and skipped.
pub fn detect_overlaps(data: &mut MapData, grid_divisor: usize, log: &ConversionLog) -> usize {
    let start = Instant::now();

    let Some(bounds) = data.data_boundary() else {
        return 0;
    };

    let mut grid = IndexGrid::new(bounds.pad(GRID_PADDING), grid_divisor);
    let candidates = collect_candidates(data, &mut grid);

    let shared: &MapData = data;
    let results: Vec<_> = candidates
        .par_iter()
        .map(|&(a, b)| (a, b, checks::classify(shared, a, b)))
        .collect();

    let mut added = 0;
    for (a, b, result) in results {
        match result {
            Ok(Some(overlap)) => {
                data.add_overlap(overlap);
                added += 1;
            }
            Ok(None) => {}
            Err(e) => log.warn(
                Some(data.element_id(a)),
                format!("overlap check with {} skipped: {}", data.element_id(b), e),
            ),
        }
    }

    log::info!(
        "[Overlap] {} candidate pairs checked, {} overlaps found in {:?}",
        candidates.len(),
        added,
        start.elapsed()
    );

    added
}

/// Probe every element against the grid in element order
fn collect_candidates(
    data: &MapData,
    grid: &mut IndexGrid<ElementRef>,
) -> Vec<(ElementRef, ElementRef)> {
    let probe_start = Instant::now();
    let mut candidates = Vec::new();

    for element in data.elements() {
        let bbox = data.element_bounds(element);
        for other in grid.insert_and_probe(element, &bbox) {
            if can_overlap(other, element) && data.element_bounds(other).intersects(&bbox) {
                candidates.push((other, element));
            }
        }
    }

    log::debug!(
        "[Overlap] Grid probing produced {} candidates in {:?}",
        candidates.len(),
        probe_start.elapsed()
    );
    candidates
}

fn can_overlap(a: ElementRef, b: ElementRef) -> bool {
    !matches!(
        (a, b),
        (ElementRef::Node(_), ElementRef::Node(_))
            | (ElementRef::Node(_), ElementRef::Segment(_))
            | (ElementRef::Segment(_), ElementRef::Node(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConversionConfig, FeatureRules};
    use crate::map_data::{create_map_data, ElementKind, MapMetadata, MapProjection, TagSet};
    use crate::osm::{OsmData, OsmNode, OsmWay};
    use crate::overlap::OverlapKind;
    use glam::DVec2;

    struct IdentityProjection;

    impl MapProjection for IdentityProjection {
        fn to_xz(&self, lat: f64, lon: f64) -> DVec2 {
            DVec2::new(lon, lat)
        }

        fn to_lat_lon(&self, pos: DVec2) -> (f64, f64) {
            (pos.y, pos.x)
        }
    }

    fn build(nodes: &[(i64, f64, f64)], ways: &[(i64, &[i64], &[(&str, &str)])]) -> MapData {
        let osm = OsmData {
            nodes: nodes
                .iter()
                .map(|&(id, x, z)| OsmNode { id, lat: z, lon: x, tags: TagSet::new() })
                .collect(),
            ways: ways
                .iter()
                .map(|&(id, refs, tags)| OsmWay {
                    id,
                    node_refs: refs.to_vec(),
                    tags: TagSet::from_pairs(tags.iter().copied()),
                })
                .collect(),
            ..OsmData::default()
        };
        let config = ConversionConfig {
            create_terrain: false,
            ..ConversionConfig::default()
        };
        create_map_data(
            &osm,
            MapMetadata::default(),
            &IdentityProjection,
            &config,
            &FeatureRules::standard(),
            &ConversionLog::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_crossing_roads_intersect() {
        let mut data = build(
            &[(1, 0.0, 5.0), (2, 10.0, 5.0), (3, 5.0, 0.0), (4, 5.0, 10.0)],
            &[
                (10, &[1, 2], &[("highway", "primary")]),
                (11, &[3, 4], &[("highway", "primary")]),
            ],
        );
        let log = ConversionLog::new();
        assert_eq!(detect_overlaps(&mut data, 1000, &log), 1);
        let overlap = &data.overlaps[0];
        assert_eq!(overlap.kind, OverlapKind::Intersect);
        assert!(overlap.intersection_positions[0].distance(DVec2::new(5.0, 5.0)) < 1e-9);
        assert_eq!(data.segments[0].overlaps.len(), 1);
        assert_eq!(data.segments[1].overlaps.len(), 1);
    }

    #[test]
    fn test_connected_roads_do_not_overlap() {
        let mut data = build(
            &[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 10.0, 10.0)],
            &[
                (10, &[1, 2], &[("highway", "primary")]),
                (11, &[2, 3], &[("highway", "primary")]),
            ],
        );
        assert_eq!(detect_overlaps(&mut data, 1000, &ConversionLog::new()), 0);
    }

    #[test]
    fn test_node_inside_area_is_contained() {
        let mut data = build(
            &[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 10.0, 10.0), (4, 0.0, 10.0), (5, 5.0, 5.0)],
            &[(10, &[1, 2, 3, 4, 1], &[("landuse", "grass")])],
        );
        assert_eq!(detect_overlaps(&mut data, 1000, &ConversionLog::new()), 1);
        let overlap = &data.overlaps[0];
        assert_eq!(overlap.kind, OverlapKind::Contain);
        assert_eq!(data.element_id(overlap.e1).kind, ElementKind::Node);
        assert_eq!(data.nodes[4].overlaps.len(), 1);
        assert_eq!(data.areas[0].overlaps.len(), 1);
    }

    #[test]
    fn test_segment_crossing_area_records_crossed_segments() {
        let mut data = build(
            &[
                (1, 0.0, 0.0),
                (2, 10.0, 0.0),
                (3, 10.0, 10.0),
                (4, 0.0, 10.0),
                (5, -5.0, 5.0),
                (6, 15.0, 5.0),
            ],
            &[
                (10, &[1, 2, 3, 4, 1], &[("landuse", "grass")]),
                (11, &[5, 6], &[("highway", "path")]),
            ],
        );
        assert_eq!(detect_overlaps(&mut data, 1000, &ConversionLog::new()), 1);
        let overlap = &data.overlaps[0];
        assert_eq!(overlap.kind, OverlapKind::Intersect);
        assert_eq!(overlap.intersection_positions.len(), 2);
        assert_eq!(overlap.intersecting_segments.len(), 2);
    }

    #[test]
    fn test_identical_areas_contain_lower_id() {
        let mut data = build(
            &[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 10.0, 10.0), (4, 0.0, 10.0),
              (5, 0.0, 0.0), (6, 10.0, 0.0), (7, 10.0, 10.0), (8, 0.0, 10.0)],
            &[
                (21, &[5, 6, 7, 8, 5], &[("landuse", "grass")]),
                (20, &[1, 2, 3, 4, 1], &[("landuse", "grass")]),
            ],
        );
        let log = ConversionLog::new();
        assert_eq!(detect_overlaps(&mut data, 1000, &log), 1);
        let overlap = &data.overlaps[0];
        assert_eq!(overlap.kind, OverlapKind::Contain);
        assert_eq!(data.element_id(overlap.e1).id, 20);
        assert_eq!(data.element_id(overlap.e2).id, 21);
    }
}
