use glam::DVec2;

use super::{AreaIdx, ElementId, NodeIdx, OverlapId, SegmentIdx, TagSet, WayIdx};
use crate::math::{LineSegmentXZ, PolygonWithHoles};

#[derive(Debug, Clone)]
pub struct MapNode {
    pub id: ElementId,
    pub pos: DVec2,
    pub tags: TagSet,
    pub connected_segments: Vec<SegmentIdx>,
    pub adjacent_areas: Vec<AreaIdx>,
    pub overlaps: Vec<OverlapId>,
}

impl MapNode {
    pub fn new(id: ElementId, pos: DVec2, tags: TagSet) -> Self {
        Self {
            id,
            pos,
            tags,
            connected_segments: Vec::new(),
            adjacent_areas: Vec::new(),
            overlaps: Vec::new(),
        }
    }
}

/// Non-area way; its geometry is the list of segments
#[derive(Debug, Clone)]
pub struct MapWay {
    pub id: ElementId,
    pub tags: TagSet,
    pub nodes: Vec<NodeIdx>,
    pub segments: Vec<SegmentIdx>,
}

/// Straight piece of a way between two consecutive nodes.
/// Tags are those of the parent way.
#[derive(Debug, Clone)]
pub struct MapWaySegment {
    /// Id of the parent way
    pub id: ElementId,
    pub way: WayIdx,
    pub start: NodeIdx,
    pub end: NodeIdx,
    pub segment: LineSegmentXZ,
    pub overlaps: Vec<OverlapId>,
}

impl MapWaySegment {
    pub fn shares_node_with(&self, other: &MapWaySegment) -> bool {
        self.start == other.start
            || self.start == other.end
            || self.end == other.start
            || self.end == other.end
    }

    /// Whether both segments connect the same two nodes, in either direction
    pub fn connects(&self, a: NodeIdx, b: NodeIdx) -> bool {
        (self.start == a && self.end == b) || (self.start == b && self.end == a)
    }
}

/// Area with node rings matching its polygon ring by ring.
/// Node rings are closed (first == last) and oriented like the polygon.
#[derive(Debug, Clone)]
pub struct MapArea {
    pub id: ElementId,
    pub tags: TagSet,
    pub outer_nodes: Vec<NodeIdx>,
    pub hole_nodes: Vec<Vec<NodeIdx>>,
    pub polygon: PolygonWithHoles,
    pub overlaps: Vec<OverlapId>,
    /// Synthetic terrain cell rather than a mapped feature
    pub is_empty_terrain: bool,
}

impl MapArea {
    pub fn node_rings(&self) -> impl Iterator<Item = &Vec<NodeIdx>> {
        std::iter::once(&self.outer_nodes).chain(self.hole_nodes.iter())
    }

    /// Consecutive node pairs along every ring
    pub fn boundary_node_pairs(&self) -> impl Iterator<Item = (NodeIdx, NodeIdx)> + '_ {
        self.node_rings()
            .flat_map(|ring| ring.windows(2).map(|w| (w[0], w[1])))
    }

    pub fn has_boundary_segment(&self, a: NodeIdx, b: NodeIdx) -> bool {
        self.boundary_node_pairs()
            .any(|(p, q)| (p == a && q == b) || (p == b && q == a))
    }

    pub fn has_node(&self, node: NodeIdx) -> bool {
        self.node_rings().any(|ring| ring.contains(&node))
    }
}
