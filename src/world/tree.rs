use std::f64::consts::TAU;

use super::{ConnectorSpec, Elevations, WorldContext, WorldObject};
use crate::elevation::GroundState;
use crate::map_data::{AreaIdx, ElementRef, MapData, NodeIdx, TagSet};
use crate::math::{DVec2, DVec3};
use crate::mesh::{ExtrusionGeometry, Geometry, LevelOfDetail, Mesh, MeshTarget};

const DEFAULT_HEIGHT: f64 = 10.0;
const DEFAULT_FOREST_HEIGHT: f64 = 20.0;
const RADIUS_PER_HEIGHT: f64 = 0.2;
const SEGMENTS: usize = 8;

/// Distance between trees in a forest
pub const FOREST_TREE_SPACING: f64 = 10.0;

/// Per-tree variation derived from the position alone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeVariation {
    pub rotation: f64,
    pub mirrored: bool,
    /// Between 0.5 and 1.25
    pub height_factor: f64,
}

impl TreeVariation {
    pub fn for_position(pos: DVec2) -> Self {
        let hash = mix(mix((pos.x + 0.0).to_bits()) ^ (pos.y + 0.0).to_bits());
        let unit = |bits: u64| (bits & 0xffff) as f64 / 65536.0;
        Self {
            rotation: unit(hash) * TAU,
            mirrored: (hash >> 16) & 1 == 1,
            height_factor: 0.5 + 0.75 * unit(hash >> 17),
        }
    }
}

/// splitmix64 finalizer
fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

fn is_coniferous(tags: &TagSet) -> bool {
    tags.contains("leaf_type", "needleleaved")
}

/// Tree made of a trunk column and a crown that is a cone for conifers
pub struct Tree {
    element: ElementRef,
    pos: DVec2,
    reference: Option<NodeIdx>,
    height: f64,
    coniferous: bool,
    variation: TreeVariation,
}

impl Tree {
    pub const TYPE: &'static str = "Tree";

    pub fn from_node(data: &MapData, node: NodeIdx) -> Self {
        let node_data = data.node(node);
        let height = node_data.tags.get_f64("height").unwrap_or(DEFAULT_HEIGHT);
        Self {
            element: ElementRef::Node(node),
            pos: node_data.pos,
            reference: Some(node),
            height,
            coniferous: is_coniferous(&node_data.tags),
            variation: TreeVariation::for_position(node_data.pos),
        }
    }

    /// Trees on a jittered grid inside a forest area, at most `limit`
    pub fn in_forest(data: &MapData, area: AreaIdx, limit: usize) -> Vec<Self> {
        let area_data = data.area(area);
        let base_height = area_data.tags.get_f64("height").unwrap_or(DEFAULT_FOREST_HEIGHT);
        let coniferous = is_coniferous(&area_data.tags);
        let bounds = area_data.polygon.bounds();

        let mut trees = Vec::new();
        let steps = |min: f64, max: f64| {
            (min / FOREST_TREE_SPACING).floor() as i64..=(max / FOREST_TREE_SPACING).ceil() as i64
        };
        for ix in steps(bounds.min_x, bounds.max_x) {
            for iz in steps(bounds.min_z, bounds.max_z) {
                let cell = DVec2::new(ix as f64, iz as f64) * FOREST_TREE_SPACING;
                let jitter = TreeVariation::for_position(cell);
                let offset = DVec2::from_angle(jitter.rotation) * (FOREST_TREE_SPACING * 0.25);
                let pos = cell + offset;
                if !area_data.polygon.contains(pos) {
                    continue;
                }
                if trees.len() == limit {
                    return trees;
                }
                let variation = TreeVariation::for_position(pos);
                trees.push(Self {
                    element: ElementRef::Area(area),
                    pos,
                    reference: None,
                    height: base_height * variation.height_factor,
                    coniferous,
                    variation,
                });
            }
        }
        trees
    }

    pub fn pos(&self) -> DVec2 {
        self.pos
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    fn column(&self, base: DVec3, radius: f64, height: f64, top_scale: f64) -> ExtrusionGeometry {
        let mut column = ExtrusionGeometry::vertical_circle(base, radius, height, top_scale, SEGMENTS);
        let rotation = DVec2::from_angle(self.variation.rotation);
        for p in &mut column.profile {
            let rotated = rotation.rotate(*p);
            *p = if self.variation.mirrored { DVec2::new(-rotated.x, rotated.y) } else { rotated };
        }
        column
    }
}

impl WorldObject for Tree {
    fn element(&self) -> ElementRef {
        self.element
    }

    fn object_type(&self) -> &'static str {
        Self::TYPE
    }

    fn ground_state(&self) -> GroundState {
        GroundState::On
    }

    fn connector_specs(&self, _ctx: &WorldContext) -> Vec<ConnectorSpec> {
        vec![ConnectorSpec::new(self.pos, GroundState::On, self.reference)]
    }

    fn render(&self, ctx: &WorldContext, elevations: &Elevations, target: &mut MeshTarget) {
        let base = elevations.xyz(self.pos);
        let radius = self.height * RADIUS_PER_HEIGHT;
        let stem_ratio = if self.coniferous { 0.3 } else { 0.5 };
        let stem_height = self.height * stem_ratio;

        let trunk = self.column(base, radius / 4.0, stem_height, 0.8);
        let crown = self.column(
            base + DVec3::Y * stem_height,
            radius,
            self.height - stem_height,
            if self.coniferous { 0.0 } else { 1.0 },
        );

        // forest trees are only worth drawing at the finer levels of detail
        let min_lod = match self.element {
            ElementRef::Area(_) => LevelOfDetail::Lod2,
            _ => LevelOfDetail::Lod0,
        };
        for (geometry, material) in [(trunk, "tree_trunk"), (crown, "tree_crown")] {
            let mesh = Mesh::new(Geometry::Extrusion(geometry), ctx.materials.surface(material).clone())
                .with_lod_range(min_lod, LevelOfDetail::Lod4);
            target.draw_mesh(mesh);
        }
    }
}
