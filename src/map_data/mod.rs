//! Map data model
//!
//! Elements live in flat arenas inside `MapData` and refer to each other by
//! index. Overlaps are stored once in their own arena and referenced by id
//! from both participants.
//!
//! # Submodules
//! - `tags` - Ordered tag sets
//! - `elements` - Nodes, ways, way segments and areas
//! - `projection` - Lat/lon to ground plane projection
//! - `multipolygon` - Ring assembly for multipolygon relations
//! - `terrain` - Empty terrain cells covering the data bounds
//! - `creation` - Building `MapData` from raw OSM data

mod tags;
mod elements;
mod projection;
mod multipolygon;
mod terrain;
mod creation;

use std::fmt;

use glam::DVec2;

use crate::math::AxisAlignedRectangle;
use crate::overlap::Overlap;

pub use creation::create_map_data;
pub use elements::{MapArea, MapNode, MapWay, MapWaySegment};
pub use projection::{LocalProjection, MapProjection};
pub use tags::TagSet;

/// Kind of the source element an id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

/// Stable identifier of a source element. Synthetic elements use negative ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    pub kind: ElementKind,
    pub id: i64,
}

impl ElementId {
    pub fn new(kind: ElementKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        };
        write!(f, "{} {}", kind, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WayIdx(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentIdx(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AreaIdx(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlapId(pub usize);

/// Reference to any element that takes part in overlap detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementRef {
    Node(NodeIdx),
    Segment(SegmentIdx),
    Area(AreaIdx),
}

/// Information about the input that is not part of any element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapMetadata {
    pub generator: Option<String>,
    pub source: Option<String>,
}

/// Converted map: element arenas, overlap arena and boundaries
#[derive(Debug, Default)]
pub struct MapData {
    pub nodes: Vec<MapNode>,
    pub ways: Vec<MapWay>,
    pub segments: Vec<MapWaySegment>,
    pub areas: Vec<MapArea>,
    pub overlaps: Vec<Overlap>,
    pub metadata: MapMetadata,
    /// Bounds of the input file (or of all nodes if the file declares none)
    pub file_boundary: Option<AxisAlignedRectangle>,
}

impl MapData {
    pub fn node(&self, idx: NodeIdx) -> &MapNode {
        &self.nodes[idx.0]
    }

    pub fn way(&self, idx: WayIdx) -> &MapWay {
        &self.ways[idx.0]
    }

    pub fn segment(&self, idx: SegmentIdx) -> &MapWaySegment {
        &self.segments[idx.0]
    }

    pub fn area(&self, idx: AreaIdx) -> &MapArea {
        &self.areas[idx.0]
    }

    pub fn overlap(&self, id: OverlapId) -> &Overlap {
        &self.overlaps[id.0]
    }

    pub fn node_pos(&self, idx: NodeIdx) -> DVec2 {
        self.nodes[idx.0].pos
    }

    /// All overlap-relevant elements: nodes, then segments, then areas
    pub fn elements(&self) -> impl Iterator<Item = ElementRef> + '_ {
        (0..self.nodes.len())
            .map(|i| ElementRef::Node(NodeIdx(i)))
            .chain((0..self.segments.len()).map(|i| ElementRef::Segment(SegmentIdx(i))))
            .chain((0..self.areas.len()).map(|i| ElementRef::Area(AreaIdx(i))))
    }

    pub fn element_id(&self, element: ElementRef) -> ElementId {
        match element {
            ElementRef::Node(n) => self.node(n).id,
            ElementRef::Segment(s) => self.segment(s).id,
            ElementRef::Area(a) => self.area(a).id,
        }
    }

    pub fn tags(&self, element: ElementRef) -> &TagSet {
        match element {
            ElementRef::Node(n) => &self.node(n).tags,
            ElementRef::Segment(s) => &self.way(self.segment(s).way).tags,
            ElementRef::Area(a) => &self.area(a).tags,
        }
    }

    pub fn element_bounds(&self, element: ElementRef) -> AxisAlignedRectangle {
        match element {
            ElementRef::Node(n) => {
                let p = self.node_pos(n);
                AxisAlignedRectangle::new(p.x, p.y, p.x, p.y)
            }
            ElementRef::Segment(s) => {
                let seg = &self.segment(s).segment;
                AxisAlignedRectangle::new(seg.p1.x, seg.p1.y, seg.p2.x, seg.p2.y)
            }
            ElementRef::Area(a) => self.area(a).polygon.bounds(),
        }
    }

    /// Bounds of all element positions, `None` for empty data
    pub fn data_boundary(&self) -> Option<AxisAlignedRectangle> {
        AxisAlignedRectangle::from_points(self.nodes.iter().map(|n| n.pos))
    }

    /// File boundary if known, otherwise the data boundary
    pub fn boundary(&self) -> Option<AxisAlignedRectangle> {
        self.file_boundary.or_else(|| self.data_boundary())
    }

    pub fn overlaps_of(&self, element: ElementRef) -> impl Iterator<Item = &Overlap> + '_ {
        let ids: &[OverlapId] = match element {
            ElementRef::Node(n) => &self.node(n).overlaps,
            ElementRef::Segment(s) => &self.segment(s).overlaps,
            ElementRef::Area(a) => &self.area(a).overlaps,
        };
        ids.iter().map(move |id| self.overlap(*id))
    }

    /// Store an overlap and attach it to both participants
    pub(crate) fn add_overlap(&mut self, overlap: Overlap) -> OverlapId {
        let id = OverlapId(self.overlaps.len());
        let (e1, e2) = (overlap.e1, overlap.e2);
        self.overlaps.push(overlap);
        for element in [e1, e2] {
            match element {
                ElementRef::Node(n) => self.nodes[n.0].overlaps.push(id),
                ElementRef::Segment(s) => self.segments[s.0].overlaps.push(id),
                ElementRef::Area(a) => self.areas[a.0].overlaps.push(id),
            }
        }
        id
    }
}
