//! Raw OSM input data
//!
//! # Submodules
//! - `reader` - `.osm` XML reader

mod reader;

use crate::map_data::{ElementKind, TagSet};

pub use reader::{parse_osm_file, parse_osm_str};

/// Bounds declared in the input file, in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OsmBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl OsmBounds {
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) * 0.5,
            (self.min_lon + self.max_lon) * 0.5,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OsmNode {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tags: TagSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OsmWay {
    pub id: i64,
    pub node_refs: Vec<i64>,
    pub tags: TagSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OsmMember {
    pub kind: ElementKind,
    pub ref_id: i64,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OsmRelation {
    pub id: i64,
    pub members: Vec<OsmMember>,
    pub tags: TagSet,
}

/// Immutable in-memory graph of nodes, ways and relations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OsmData {
    pub bounds: Option<OsmBounds>,
    pub generator: Option<String>,
    pub nodes: Vec<OsmNode>,
    pub ways: Vec<OsmWay>,
    pub relations: Vec<OsmRelation>,
}

impl OsmData {
    /// Declared bounds, or the extent of all nodes
    pub fn effective_bounds(&self) -> Option<OsmBounds> {
        self.bounds.or_else(|| {
            let mut nodes = self.nodes.iter();
            let first = nodes.next()?;
            Some(nodes.fold(
                OsmBounds {
                    min_lat: first.lat,
                    min_lon: first.lon,
                    max_lat: first.lat,
                    max_lon: first.lon,
                },
                |b, n| OsmBounds {
                    min_lat: b.min_lat.min(n.lat),
                    min_lon: b.min_lon.min(n.lon),
                    max_lat: b.max_lat.max(n.lat),
                    max_lon: b.max_lon.max(n.lon),
                },
            ))
        })
    }
}
