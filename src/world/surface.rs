use std::collections::HashMap;
use std::sync::OnceLock;

use indexmap::IndexSet;

use super::{ConnectorSpec, Elevations, WorldContext, WorldObject};
use crate::algorithms::{subtract_polygons, triangulate_polygon};
use crate::config::EMPTY_TERRAIN_SURFACE;
use crate::elevation::{ConstraintType, EleConnectorGroup, EleConstraintEnforcer, GroundState};
use crate::map_data::{AreaIdx, ElementRef, MapData, NodeIdx, TagSet};
use crate::math::{DVec2, PolygonWithHoles, TriangleXYZ, TriangleXZ};
use crate::mesh::MeshTarget;

/// Ground state implied by `bridge`/`tunnel` tags
pub(super) fn ground_state_from_tags(tags: &TagSet) -> GroundState {
    let flagged = |key: &str| tags.get(key).is_some_and(|v| v != "no");
    if flagged("bridge") {
        GroundState::Above
    } else if flagged("tunnel") && !is_passage(tags) {
        GroundState::Below
    } else {
        GroundState::On
    }
}

/// Passage through a building at ground level
pub(super) fn is_passage(tags: &TagSet) -> bool {
    matches!(tags.get("tunnel"), Some("building_passage" | "passage"))
}

/// Area covered by a ground material. Its triangulation leaves out the
/// ground covered by other objects and includes their connectors, so the
/// surface follows their elevations.
pub struct SurfaceArea {
    area: AreaIdx,
    surface: String,
    ground_state: GroundState,
    triangulation: OnceLock<Vec<TriangleXZ>>,
}

impl SurfaceArea {
    pub const TYPE: &'static str = "SurfaceArea";

    pub fn new(data: &MapData, area: AreaIdx, surface: impl Into<String>) -> Self {
        Self {
            area,
            surface: surface.into(),
            ground_state: ground_state_from_tags(&data.area(area).tags),
            triangulation: OnceLock::new(),
        }
    }

    pub fn surface(&self) -> &str {
        &self.surface
    }

    /// Ground-plane triangles, computed on first use
    pub fn triangulation(&self, ctx: &WorldContext) -> &[TriangleXZ] {
        self.triangulation.get_or_init(|| self.compute_triangulation(ctx))
    }

    fn compute_triangulation(&self, ctx: &WorldContext) -> Vec<TriangleXZ> {
        let element = ElementRef::Area(self.area);
        let area = ctx.data.area(self.area);
        let empty_terrain = self.is_empty_terrain();

        let mut subtract: Vec<PolygonWithHoles> = Vec::new();
        let mut blocking: Vec<PolygonWithHoles> = Vec::new();
        let mut points: Vec<DVec2> = Vec::new();

        // elevated surfaces keep their full shape
        if self.ground_state == GroundState::On {
            for overlap in ctx.data.overlaps_of(element) {
                let Some(other) = overlap.other(element) else { continue };
                for (_, object) in ctx.world.representations(other) {
                    if object.ground_state() != GroundState::On {
                        points.extend(
                            object
                                .connector_specs(ctx)
                                .into_iter()
                                .filter(|spec| spec.reference.is_some())
                                .map(|spec| spec.pos),
                        );
                        blocking.extend(object.outline(ctx.data));
                        continue;
                    }

                    // empty terrain yields to every other surface, other surfaces ignore each other
                    if object.is_surface() && (!empty_terrain || object.is_empty_terrain()) {
                        continue;
                    }
                    if overlap.is_contained(element) {
                        return Vec::new();
                    }

                    let boundaries = object.terrain_boundaries(ctx.data);
                    let specs = object.connector_specs(ctx);
                    if boundaries.is_empty() {
                        points.extend(specs.iter().map(|spec| spec.pos));
                    }
                    for boundary in boundaries {
                        points.extend(
                            specs
                                .iter()
                                .filter(|spec| !boundary.rings().any(|r| r.vertices().contains(&spec.pos)))
                                .map(|spec| spec.pos),
                        );
                        blocking.push(boundary.clone());
                        subtract.push(boundary);
                    }
                }
            }
        }

        let spacing = ctx.config.terrain_point_grid_distance;
        if spacing > 0.0 {
            let bounds = area.polygon.bounds();
            let (x0, x1) = ((bounds.min_x / spacing).ceil() as i64, (bounds.max_x / spacing).floor() as i64);
            let (z0, z1) = ((bounds.min_z / spacing).ceil() as i64, (bounds.max_z / spacing).floor() as i64);
            for ix in x0..=x1 {
                for iz in z0..=z1 {
                    let p = DVec2::new(ix as f64 * spacing, iz as f64 * spacing);
                    // points on top of e.g. tunnels would prevent a vertical distance
                    if !blocking.iter().any(|b| b.contains(p)) {
                        points.push(p);
                    }
                }
            }
        }

        let leftover = if subtract.is_empty() {
            vec![area.polygon.clone()]
        } else {
            match subtract_polygons(&area.polygon, &subtract) {
                Ok(polygons) => polygons,
                Err(e) => {
                    ctx.log.warn(Some(area.id), format!("terrain carving failed: {e}"));
                    vec![area.polygon.clone()]
                }
            }
        };

        let mut triangles = Vec::new();
        for polygon in &leftover {
            let inside: Vec<DVec2> = points.iter().copied().filter(|p| polygon.contains(*p)).collect();
            match triangulate_polygon(polygon, &inside) {
                Ok(t) => triangles.extend(t),
                Err(e) => ctx.log.warn(Some(area.id), format!("triangulation failed: {e}")),
            }
        }
        triangles
    }
}

impl WorldObject for SurfaceArea {
    fn element(&self) -> ElementRef {
        ElementRef::Area(self.area)
    }

    fn object_type(&self) -> &'static str {
        Self::TYPE
    }

    fn ground_state(&self) -> GroundState {
        self.ground_state
    }

    fn connector_specs(&self, ctx: &WorldContext) -> Vec<ConnectorSpec> {
        let area = ctx.data.area(self.area);
        let nodes: HashMap<(u64, u64), NodeIdx> = area
            .node_rings()
            .flatten()
            .map(|&n| (bits(ctx.data.node_pos(n)), n))
            .collect();

        let mut seen = IndexSet::new();
        let mut specs = Vec::new();
        for v in self.triangulation(ctx).iter().flat_map(|t| t.vertices()) {
            if seen.insert(bits(v)) {
                specs.push(ConnectorSpec::new(v, self.ground_state, nodes.get(&bits(v)).copied()));
            }
        }
        specs
    }

    /// Keeps objects above or below the surface at a distance from it
    fn define_constraints(
        &self,
        ctx: &WorldContext,
        own: &EleConnectorGroup,
        enforcer: &mut EleConstraintEnforcer,
    ) {
        let element = self.element();
        for overlap in ctx.data.overlaps_of(element) {
            let Some(other) = overlap.other(element) else { continue };
            for (idx, _) in ctx.world.representations(other) {
                for &id in ctx.world.connectors(idx).ids() {
                    let connector = enforcer.connector(id);
                    let (pos, ground_state) = (connector.pos, connector.ground_state);
                    let Some(own_id) = own.get(pos) else { continue };
                    match ground_state {
                        GroundState::Above => enforcer.require_vertical_distance(
                            ConstraintType::Min,
                            ctx.config.surface_clearance_above,
                            id,
                            own_id,
                        ),
                        GroundState::Below => enforcer.require_vertical_distance(
                            ConstraintType::Min,
                            ctx.config.surface_clearance_below,
                            own_id,
                            id,
                        ),
                        GroundState::On => {}
                    }
                }
            }
        }
    }

    fn terrain_boundaries(&self, data: &MapData) -> Vec<PolygonWithHoles> {
        self.outline(data).into_iter().collect()
    }

    /// Empty terrain has no outline, so it never blocks anything
    fn outline(&self, data: &MapData) -> Option<PolygonWithHoles> {
        (!self.is_empty_terrain()).then(|| data.area(self.area).polygon.clone())
    }

    fn is_surface(&self) -> bool {
        true
    }

    fn is_empty_terrain(&self) -> bool {
        self.surface == EMPTY_TERRAIN_SURFACE
    }

    fn render(&self, ctx: &WorldContext, elevations: &Elevations, target: &mut MeshTarget) {
        let material = ctx.materials.surface(&self.surface);
        let triangles = self
            .triangulation(ctx)
            .iter()
            .map(|t| TriangleXYZ::new(elevations.xyz(t.v1), elevations.xyz(t.v2), elevations.xyz(t.v3)))
            .collect();
        target.draw_triangles(material, triangles);
    }
}

fn bits(p: DVec2) -> (u64, u64) {
    ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
}
