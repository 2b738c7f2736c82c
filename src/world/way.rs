use super::surface::ground_state_from_tags;
use super::{ConnectorSpec, Elevations, WorldContext, WorldObject};
use crate::elevation::{ConstraintType, EleConnectorGroup, EleConstraintEnforcer, GroundState};
use crate::map_data::{ElementRef, MapData, SegmentIdx, TagSet};
use crate::math::{xyz, DVec2, PolygonWithHoles, SimplePolygon, TriangleXYZ};
use crate::mesh::MeshTarget;
use crate::overlap::OverlapKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WayCategory {
    Road,
    Path,
    Railway,
    Waterway,
}

impl WayCategory {
    fn from_tags(tags: &TagSet) -> Option<Self> {
        if let Some(highway) = tags.get("highway") {
            return Some(match highway {
                "footway" | "path" | "cycleway" | "steps" | "pedestrian" | "bridleway" | "track" => {
                    WayCategory::Path
                }
                _ => WayCategory::Road,
            });
        }
        if tags.contains_key("railway") {
            return Some(WayCategory::Railway);
        }
        if tags.contains_key("waterway") {
            return Some(WayCategory::Waterway);
        }
        None
    }

    fn default_width(self, tags: &TagSet) -> f64 {
        match self {
            WayCategory::Road => match tags.get("highway") {
                Some("motorway" | "trunk") => 10.0,
                Some("primary" | "secondary") => 7.0,
                Some("service") => 3.5,
                _ => 5.0,
            },
            WayCategory::Path => 2.0,
            WayCategory::Railway => 2.5,
            WayCategory::Waterway => match tags.get("waterway") {
                Some("river") => 10.0,
                _ => 2.0,
            },
        }
    }

    fn default_surface(self, tags: &TagSet) -> &'static str {
        match self {
            WayCategory::Road => "asphalt",
            WayCategory::Path => match tags.get("highway") {
                Some("footway" | "pedestrian" | "steps") => "paving_stones",
                _ => "ground",
            },
            WayCategory::Railway => "gravel",
            WayCategory::Waterway => "water",
        }
    }
}

/// Straight piece of a linear feature, drawn as a flat strip.
///
/// Crossings with other segments get their own connectors, so bridges and
/// tunnels keep their clearance exactly where they pass over or under.
pub struct WaySegmentObject {
    segment: SegmentIdx,
    category: WayCategory,
    width: f64,
    surface: String,
    ground_state: GroundState,
}

impl WaySegmentObject {
    /// Representation for a segment, `None` for ways that are not linear features
    pub fn new(data: &MapData, segment: SegmentIdx) -> Option<Self> {
        let tags = data.tags(ElementRef::Segment(segment));
        let category = WayCategory::from_tags(tags)?;
        let width = tags
            .get_f64("width")
            .filter(|w| *w > 0.0)
            .unwrap_or_else(|| category.default_width(tags));
        let surface = tags
            .get("surface")
            .unwrap_or_else(|| category.default_surface(tags))
            .to_string();
        Some(Self {
            segment,
            category,
            width,
            surface,
            ground_state: ground_state_from_tags(tags),
        })
    }

    pub fn category(&self) -> WayCategory {
        self.category
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Start, crossings ordered along the segment, end
    fn positions(&self, data: &MapData) -> Vec<DVec2> {
        let segment = &data.segment(self.segment).segment;
        let mut crossings: Vec<DVec2> = data
            .overlaps_of(self.element())
            .filter(|o| o.kind == OverlapKind::Intersect)
            .filter(|o| matches!(o.other(self.element()), Some(ElementRef::Segment(_))))
            .flat_map(|o| o.intersection_positions.iter().copied())
            .filter(|p| !segment.is_endpoint(*p))
            .collect();
        crossings.sort_by(|a, b| a.distance(segment.p1).total_cmp(&b.distance(segment.p1)));
        crossings.dedup();

        let mut positions = vec![segment.p1];
        positions.extend(crossings);
        positions.push(segment.p2);
        positions
    }
}

impl WorldObject for WaySegmentObject {
    fn element(&self) -> ElementRef {
        ElementRef::Segment(self.segment)
    }

    fn object_type(&self) -> &'static str {
        match self.category {
            WayCategory::Road => "Road",
            WayCategory::Path => "Path",
            WayCategory::Railway => "Railway",
            WayCategory::Waterway => "Waterway",
        }
    }

    fn ground_state(&self) -> GroundState {
        self.ground_state
    }

    fn connector_specs(&self, ctx: &WorldContext) -> Vec<ConnectorSpec> {
        let segment = ctx.data.segment(self.segment);
        let positions = self.positions(ctx.data);
        let last = positions.len() - 1;
        positions
            .into_iter()
            .enumerate()
            .map(|(i, pos)| {
                let reference = match i {
                    0 => Some(segment.start),
                    i if i == last => Some(segment.end),
                    _ => None,
                };
                ConnectorSpec::new(pos, self.ground_state, reference)
            })
            .collect()
    }

    /// Bridges stay above and tunnels below the ground-level segments they cross
    fn define_constraints(
        &self,
        ctx: &WorldContext,
        own: &EleConnectorGroup,
        enforcer: &mut EleConstraintEnforcer,
    ) {
        if self.ground_state == GroundState::On {
            return;
        }
        let element = self.element();
        for overlap in ctx.data.overlaps_of(element) {
            if overlap.kind != OverlapKind::Intersect {
                continue;
            }
            let Some(other) = overlap.other(element) else { continue };
            for (idx, object) in ctx.world.representations(other) {
                if object.ground_state() != GroundState::On {
                    continue;
                }
                for &pos in &overlap.intersection_positions {
                    let (Some(own_id), Some(other_id)) = (own.get(pos), ctx.world.connectors(idx).get(pos)) else {
                        continue;
                    };
                    match self.ground_state {
                        GroundState::Above => enforcer.require_vertical_distance(
                            ConstraintType::Min,
                            ctx.config.bridge_clearance,
                            own_id,
                            other_id,
                        ),
                        GroundState::Below => enforcer.require_vertical_distance(
                            ConstraintType::Min,
                            ctx.config.tunnel_clearance,
                            other_id,
                            own_id,
                        ),
                        GroundState::On => {}
                    }
                }
            }
        }
    }

    fn terrain_boundaries(&self, data: &MapData) -> Vec<PolygonWithHoles> {
        if self.ground_state == GroundState::On {
            self.outline(data).into_iter().collect()
        } else {
            Vec::new()
        }
    }

    /// Rectangle covered by the strip
    fn outline(&self, data: &MapData) -> Option<PolygonWithHoles> {
        let segment = &data.segment(self.segment).segment;
        let side = segment.right_normal() * (self.width / 2.0);
        SimplePolygon::new(vec![
            segment.p1 - side,
            segment.p2 - side,
            segment.p2 + side,
            segment.p1 + side,
        ])
        .ok()
        .map(PolygonWithHoles::from)
    }

    fn render(&self, ctx: &WorldContext, elevations: &Elevations, target: &mut MeshTarget) {
        let segment = &ctx.data.segment(self.segment).segment;
        let side = segment.right_normal() * (self.width / 2.0);
        let positions = self.positions(ctx.data);

        let mut triangles = Vec::new();
        for pair in positions.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (ea, eb) = (elevations.at(a), elevations.at(b));
            let left_a = xyz(a - side, ea);
            let right_a = xyz(a + side, ea);
            let left_b = xyz(b - side, eb);
            let right_b = xyz(b + side, eb);
            for t in [
                TriangleXYZ::new(left_a, right_a, right_b),
                TriangleXYZ::new(left_a, right_b, left_b),
            ] {
                triangles.push(if t.normal().y < 0.0 { t.reversed() } else { t });
            }
        }
        target.draw_triangles(ctx.materials.surface(&self.surface), triangles);
    }
}
