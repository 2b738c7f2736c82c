use std::time::Instant;

use super::{Building, SurfaceArea, Tree, WaySegmentObject, World};
use crate::config::{FeatureRules, EMPTY_TERRAIN_SURFACE};
use crate::conversion::ConversionLog;
use crate::map_data::{AreaIdx, MapData, NodeIdx, SegmentIdx, TagSet};

/// Upper bound on generated trees per forest area
const MAX_FOREST_TREES: usize = 5000;

fn is_building(tags: &TagSet) -> bool {
    tags.get("building").is_some_and(|v| v != "no") || tags.contains_key("building:part")
}

fn is_forest(tags: &TagSet) -> bool {
    tags.contains("natural", "wood") || tags.contains("landuse", "forest")
}

/// Create the world objects for every map element that has a representation.
/// Elements without one are skipped silently.
pub fn create_world(data: &MapData, rules: &FeatureRules, log: &ConversionLog) -> World {
    let start = Instant::now();
    let mut world = World::new();
    let (mut areas, mut segments, mut nodes) = (0, 0, 0);

    for (i, area) in data.areas.iter().enumerate() {
        let idx = AreaIdx(i);
        let before = world.len();
        if area.is_empty_terrain {
            world.add(Box::new(SurfaceArea::new(data, idx, EMPTY_TERRAIN_SURFACE)));
        } else if is_building(&area.tags) {
            world.add(Box::new(Building::new(data, idx)));
        } else if is_forest(&area.tags) {
            let surface = rules.surface(&area.tags).unwrap_or("ground");
            world.add(Box::new(SurfaceArea::new(data, idx, surface)));
            let trees = Tree::in_forest(data, idx, MAX_FOREST_TREES);
            if trees.len() == MAX_FOREST_TREES {
                log.warn(Some(area.id), format!("forest limited to {} trees", MAX_FOREST_TREES));
            }
            for tree in trees {
                world.add(Box::new(tree));
            }
        } else if let Some(surface) = rules.surface(&area.tags) {
            world.add(Box::new(SurfaceArea::new(data, idx, surface)));
        }
        areas += world.len() - before;
    }

    for i in 0..data.segments.len() {
        if let Some(object) = WaySegmentObject::new(data, SegmentIdx(i)) {
            world.add(Box::new(object));
            segments += 1;
        }
    }

    for (i, node) in data.nodes.iter().enumerate() {
        if node.tags.contains("natural", "tree") {
            world.add(Box::new(Tree::from_node(data, NodeIdx(i))));
            nodes += 1;
        }
    }

    log::info!(
        "[World] {} objects ({} for areas, {} for segments, {} for nodes) in {:?}",
        world.len(),
        areas,
        segments,
        nodes,
        start.elapsed()
    );
    world
}
