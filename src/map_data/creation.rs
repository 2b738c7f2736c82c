//! Conversion of raw OSM data into `MapData`
//!
//! Per-element problems (missing nodes, broken rings) are written to the
//! conversion log and the element is dropped. Only an oversized input
//! aborts creation.

use std::collections::HashMap;
use std::time::Instant;

use glam::DVec2;

use super::elements::{MapArea, MapNode, MapWay, MapWaySegment};
use super::multipolygon::{assemble_rings, nest_rings};
use super::{
    terrain, AreaIdx, ElementId, ElementKind, MapData, MapMetadata, MapProjection, NodeIdx,
    SegmentIdx, TagSet, WayIdx,
};
use crate::config::{ConversionConfig, FeatureRules};
use crate::conversion::ConversionLog;
use crate::error::{BoundsTooLargeError, ConversionError, GeometryError, MissingReferenceError};
use crate::math::{AxisAlignedRectangle, LineSegmentXZ, PolygonWithHoles, SimplePolygon, POSITION_EPSILON};
use crate::osm::{OsmData, OsmRelation, OsmWay};

/// Build the map data arenas from raw input.
///
/// Fails with `BoundsTooLarge` if the input is larger than
/// `config.max_bounds_size` and `config.fail_on_large_bbox` is set.
pub fn create_map_data(
    osm: &OsmData,
    metadata: MapMetadata,
    projection: &dyn MapProjection,
    config: &ConversionConfig,
    rules: &FeatureRules,
    log: &ConversionLog,
) -> Result<MapData, ConversionError> {
    let start = Instant::now();

    let mut data = MapData {
        metadata,
        ..MapData::default()
    };

    if let Some(bounds) = osm.effective_bounds() {
        let min = projection.to_xz(bounds.min_lat, bounds.min_lon);
        let max = projection.to_xz(bounds.max_lat, bounds.max_lon);
        let boundary = AxisAlignedRectangle::new(min.x, min.y, max.x, max.y);
        check_bounds_size(&boundary, config)?;
        data.file_boundary = Some(boundary);
    }

    let mut node_index: HashMap<i64, NodeIdx> = HashMap::with_capacity(osm.nodes.len());
    for node in &osm.nodes {
        let id = ElementId::new(ElementKind::Node, node.id);
        if !(node.lat.is_finite() && node.lon.is_finite()) {
            log.warn(Some(id), "node has invalid coordinates");
            continue;
        }
        node_index.insert(node.id, NodeIdx(data.nodes.len()));
        data.nodes.push(MapNode::new(id, projection.to_xz(node.lat, node.lon), node.tags.clone()));
    }

    // resolved node lists of every way, also used for relation members
    let mut way_nodes: HashMap<i64, Vec<NodeIdx>> = HashMap::with_capacity(osm.ways.len());

    for way in &osm.ways {
        let id = ElementId::new(ElementKind::Way, way.id);
        let nodes = match resolve_way_nodes(way, &node_index) {
            Ok(nodes) => nodes,
            Err(e) => {
                log.error(Some(id), e.to_string());
                continue;
            }
        };
        way_nodes.insert(way.id, nodes.clone());

        if way.tags.is_empty() {
            continue;
        }

        let closed = nodes.len() >= 4 && nodes.first() == nodes.last();
        if closed && rules.is_area(&way.tags) {
            if let Err(e) = add_area(&mut data, id, way.tags.clone(), nodes, Vec::new(), false) {
                log.warn(Some(id), format!("area dropped: {}", e));
            }
        } else {
            add_way(&mut data, id, way.tags.clone(), nodes);
        }
    }

    for relation in &osm.relations {
        if relation.tags.contains("type", "multipolygon") {
            add_multipolygon(&mut data, relation, &way_nodes, log);
        } else {
            warn_incomplete_members(relation, &node_index, &way_nodes, osm, log);
        }
    }

    if config.create_terrain {
        terrain::add_empty_terrain(&mut data, config.terrain_cell_size);
    }

    log::info!(
        "[MapData] Created {} nodes, {} ways, {} segments, {} areas in {:?}",
        data.nodes.len(),
        data.ways.len(),
        data.segments.len(),
        data.areas.len(),
        start.elapsed()
    );

    Ok(data)
}

fn check_bounds_size(
    bounds: &AxisAlignedRectangle,
    config: &ConversionConfig,
) -> Result<(), BoundsTooLargeError> {
    let too_large =
        bounds.size_x() > config.max_bounds_size || bounds.size_z() > config.max_bounds_size;
    if too_large && config.fail_on_large_bbox {
        return Err(BoundsTooLargeError {
            width: bounds.size_x(),
            height: bounds.size_z(),
            limit: config.max_bounds_size,
        });
    }
    if too_large {
        log::warn!(
            "[MapData] Converting oversized data ({:.0} x {:.0} m) because the size check is disabled",
            bounds.size_x(),
            bounds.size_z()
        );
    }
    Ok(())
}

fn resolve_way_nodes(
    way: &OsmWay,
    node_index: &HashMap<i64, NodeIdx>,
) -> Result<Vec<NodeIdx>, MissingReferenceError> {
    let mut nodes: Vec<NodeIdx> = Vec::with_capacity(way.node_refs.len());
    for &node_ref in &way.node_refs {
        let idx = node_index.get(&node_ref).ok_or(MissingReferenceError {
            element: ElementId::new(ElementKind::Way, way.id),
            missing: ElementId::new(ElementKind::Node, node_ref),
        })?;
        // repeated consecutive references add nothing to the geometry
        if nodes.last() != Some(idx) {
            nodes.push(*idx);
        }
    }
    Ok(nodes)
}

/// Orient a closed node ring and build its polygon
fn oriented_ring(
    data: &MapData,
    mut ring: Vec<NodeIdx>,
    clockwise: bool,
) -> Result<(Vec<NodeIdx>, SimplePolygon), GeometryError> {
    ring.dedup();
    let polygon = SimplePolygon::new(ring.iter().map(|&n| data.node_pos(n)).collect())?;
    if polygon.is_clockwise() != clockwise {
        ring.reverse();
        Ok((ring, polygon.reversed()))
    } else {
        Ok((ring, polygon))
    }
}

pub(super) fn add_area(
    data: &mut MapData,
    id: ElementId,
    tags: TagSet,
    outer: Vec<NodeIdx>,
    holes: Vec<Vec<NodeIdx>>,
    is_empty_terrain: bool,
) -> Result<AreaIdx, GeometryError> {
    let (outer_nodes, outer_polygon) = oriented_ring(data, outer, false)?;

    let mut hole_nodes = Vec::with_capacity(holes.len());
    let mut hole_polygons = Vec::with_capacity(holes.len());
    for hole in holes {
        let (nodes, polygon) = oriented_ring(data, hole, true)?;
        hole_nodes.push(nodes);
        hole_polygons.push(polygon);
    }

    let idx = AreaIdx(data.areas.len());
    let area = MapArea {
        id,
        tags,
        outer_nodes,
        hole_nodes,
        polygon: PolygonWithHoles::new(outer_polygon, hole_polygons),
        overlaps: Vec::new(),
        is_empty_terrain,
    };

    for ring in area.node_rings() {
        for &n in ring {
            let adjacent = &mut data.nodes[n.0].adjacent_areas;
            if !adjacent.contains(&idx) {
                adjacent.push(idx);
            }
        }
    }

    data.areas.push(area);
    Ok(idx)
}

fn add_way(data: &mut MapData, id: ElementId, tags: TagSet, nodes: Vec<NodeIdx>) -> WayIdx {
    let way_idx = WayIdx(data.ways.len());
    let mut segments = Vec::with_capacity(nodes.len().saturating_sub(1));

    for pair in nodes.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let (p1, p2): (DVec2, DVec2) = (data.node_pos(start), data.node_pos(end));
        if p1.distance(p2) <= POSITION_EPSILON {
            continue;
        }
        let segment_idx = SegmentIdx(data.segments.len());
        data.segments.push(MapWaySegment {
            id,
            way: way_idx,
            start,
            end,
            segment: LineSegmentXZ::new(p1, p2),
            overlaps: Vec::new(),
        });
        data.nodes[start.0].connected_segments.push(segment_idx);
        data.nodes[end.0].connected_segments.push(segment_idx);
        segments.push(segment_idx);
    }

    data.ways.push(MapWay { id, tags, nodes, segments });
    way_idx
}

fn add_multipolygon(
    data: &mut MapData,
    relation: &OsmRelation,
    way_nodes: &HashMap<i64, Vec<NodeIdx>>,
    log: &ConversionLog,
) {
    let id = ElementId::new(ElementKind::Relation, relation.id);

    let mut members = Vec::new();
    let mut missing = 0;
    for member in relation.members.iter().filter(|m| m.kind == ElementKind::Way) {
        match way_nodes.get(&member.ref_id) {
            Some(nodes) => members.push(nodes.clone()),
            None => missing += 1,
        }
    }
    if missing > 0 {
        log.warn(Some(id), format!("multipolygon has {} incomplete members", missing));
    }

    let ring_sets = match assemble_rings(&members).and_then(|rings| nest_rings(rings, |n| data.node_pos(n))) {
        Ok(ring_sets) => ring_sets,
        Err(e) => {
            log.warn(Some(id), format!("multipolygon dropped: {}", e));
            return;
        }
    };

    for (outer, holes) in ring_sets {
        if let Err(e) = add_area(data, id, relation.tags.clone(), outer, holes, false) {
            log.warn(Some(id), format!("multipolygon part dropped: {}", e));
        }
    }
}

fn warn_incomplete_members(
    relation: &OsmRelation,
    node_index: &HashMap<i64, NodeIdx>,
    way_nodes: &HashMap<i64, Vec<NodeIdx>>,
    osm: &OsmData,
    log: &ConversionLog,
) {
    let missing = relation
        .members
        .iter()
        .filter(|m| match m.kind {
            ElementKind::Node => !node_index.contains_key(&m.ref_id),
            ElementKind::Way => !way_nodes.contains_key(&m.ref_id),
            ElementKind::Relation => !osm.relations.iter().any(|r| r.id == m.ref_id),
        })
        .count();
    if missing > 0 {
        log.warn(
            Some(ElementId::new(ElementKind::Relation, relation.id)),
            format!("relation has {} incomplete members", missing),
        );
    }
}
