use std::sync::OnceLock;

use super::surface::is_passage;
use super::{ConnectorSpec, Elevations, WorldContext, WorldObject};
use crate::algorithms::{intersect_polygons, subtract_polygons, triangulate_polygon};
use crate::elevation::{EleConnectorGroup, EleConstraintEnforcer, GroundState};
use crate::map_data::{AreaIdx, ElementRef, MapData};
use crate::math::{xyz, DVec2, LineSegmentXZ, PolygonWithHoles, SimplePolygon, TriangleXYZ};
use crate::mesh::{Geometry, Material, Mesh, MeshTarget, TriangleGeometry};

const LEVEL_HEIGHT: f64 = 3.0;
const DEFAULT_LEVELS: f64 = 2.0;

/// Height of floors above building passages
pub const PASSAGE_CLEARANCE: f64 = 2.5;

/// Building with a flat roof. Passages through it lift the floor above them.
pub struct Building {
    area: AreaIdx,
    height: f64,
    floors: OnceLock<Vec<(PolygonWithHoles, f64)>>,
}

impl Building {
    pub const TYPE: &'static str = "Building";

    pub fn new(data: &MapData, area: AreaIdx) -> Self {
        let tags = &data.area(area).tags;
        let height = tags
            .get_f64("height")
            .or_else(|| tags.get_f64("building:levels").map(|levels| levels * LEVEL_HEIGHT))
            .unwrap_or(DEFAULT_LEVELS * LEVEL_HEIGHT)
            .max(0.1);
        Self {
            area,
            height,
            floors: OnceLock::new(),
        }
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Footprint parts with the height of their lowest floor above the base
    pub fn floor_polygons(&self, ctx: &WorldContext) -> &[(PolygonWithHoles, f64)] {
        self.floors.get_or_init(|| self.compute_floors(ctx))
    }

    fn compute_floors(&self, ctx: &WorldContext) -> Vec<(PolygonWithHoles, f64)> {
        let area = ctx.data.area(self.area);
        let polygon = &area.polygon;
        let element = self.element();

        let mut passages: Vec<(PolygonWithHoles, Option<LineSegmentXZ>)> = Vec::new();
        if PASSAGE_CLEARANCE < self.height {
            for overlap in ctx.data.overlaps_of(element) {
                let Some(other) = overlap.other(element) else { continue };
                if !is_passage(ctx.data.tags(other)) {
                    continue;
                }
                let segment = match other {
                    ElementRef::Segment(s) => Some(ctx.data.segment(s).segment),
                    _ => None,
                };
                for (_, object) in ctx.world.representations(other) {
                    if object.ground_state() != GroundState::On {
                        continue;
                    }
                    if let Some(outline) = object.outline(ctx.data) {
                        passages.push((outline, segment));
                    }
                }
            }
        }
        if passages.is_empty() {
            return vec![(polygon.clone(), 0.0)];
        }

        let mut subtract = Vec::new();
        for (outline, segment) in &passages {
            subtract.push(outline.clone());
            // passages ending on the outline are extended so they cut cleanly through it
            if let Some(segment) = segment {
                let direction = segment.direction();
                let on_outline = |p: DVec2| polygon.rings().any(|r| r.vertices().contains(&p));
                if on_outline(segment.p1) {
                    subtract.extend(shifted(outline, direction));
                }
                if on_outline(segment.p2) {
                    subtract.extend(shifted(outline, -direction));
                }
            }
        }

        let carve = || -> Result<Vec<(PolygonWithHoles, f64)>, crate::error::GeometryError> {
            let mut floors: Vec<(PolygonWithHoles, f64)> =
                subtract_polygons(polygon, &subtract)?.into_iter().map(|p| (p, 0.0)).collect();

            let outer = PolygonWithHoles::from(polygon.outer().clone());
            let holes: Vec<PolygonWithHoles> =
                polygon.holes().iter().cloned().map(PolygonWithHoles::from).collect();
            for (outline, _) in &passages {
                let above = PolygonWithHoles::from(outline.outer().clone());
                for part in intersect_polygons(&[outer.clone(), above])? {
                    for raised in subtract_polygons(&part, &holes)? {
                        floors.push((raised, PASSAGE_CLEARANCE));
                    }
                }
            }
            Ok(floors)
        };

        match carve() {
            Ok(floors) => floors,
            Err(e) => {
                ctx.log.warn(Some(area.id), format!("building passage ignored: {e}"));
                vec![(polygon.clone(), 0.0)]
            }
        }
    }
}

fn shifted(polygon: &PolygonWithHoles, offset: DVec2) -> Option<PolygonWithHoles> {
    let vertices = polygon.outer().distinct_vertices().iter().map(|v| *v + offset).collect();
    SimplePolygon::new(vertices).ok().map(PolygonWithHoles::from)
}

/// Vertical wall quads along a ring, facing to the right of the ring direction
fn wall_geometry(ring: &SimplePolygon, bottom: f64, top: f64, material: &Material) -> TriangleGeometry {
    let mut triangles = Vec::new();
    let mut uvs: Vec<[(f64, f64); 3]> = Vec::new();
    let mut along = 0.0;
    for segment in ring.segments() {
        let length = segment.length();
        let outward = xyz(segment.right_normal(), 0.0);
        let (a0, b0) = (xyz(segment.p1, bottom), xyz(segment.p2, bottom));
        let (a1, b1) = (xyz(segment.p1, top), xyz(segment.p2, top));
        let (u0, u1, v1) = (along, along + length, top - bottom);
        for (t, uv) in [
            (TriangleXYZ::new(a0, b0, b1), [(u0, 0.0), (u1, 0.0), (u1, v1)]),
            (TriangleXYZ::new(a0, b1, a1), [(u0, 0.0), (u1, v1), (u0, v1)]),
        ] {
            if t.is_degenerate_or_nan() {
                continue;
            }
            if t.normal().dot(outward) < 0.0 {
                triangles.push(t.reversed());
                uvs.push([uv[0], uv[2], uv[1]]);
            } else {
                triangles.push(t);
                uvs.push(uv);
            }
        }
        along += length;
    }

    let tex_coords = material
        .texture_layers
        .iter()
        .map(|layer| {
            let (width, height) = layer.base_color.dimensions();
            uvs.iter()
                .flatten()
                .map(|&(u, v)| DVec2::new(u / width, v / height))
                .collect()
        })
        .collect();
    TriangleGeometry::new(triangles, material.interpolation).with_tex_coords(tex_coords)
}

fn flat_triangles(polygon: &PolygonWithHoles, ele: f64, facing_up: bool) -> Vec<TriangleXYZ> {
    match triangulate_polygon(polygon, &[]) {
        Ok(triangles) => triangles
            .iter()
            .map(|t| {
                let t = t.to_xyz(|_| ele);
                if facing_up { t } else { t.reversed() }
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}

impl WorldObject for Building {
    fn element(&self) -> ElementRef {
        ElementRef::Area(self.area)
    }

    fn object_type(&self) -> &'static str {
        Self::TYPE
    }

    fn ground_state(&self) -> GroundState {
        GroundState::On
    }

    fn connector_specs(&self, ctx: &WorldContext) -> Vec<ConnectorSpec> {
        let area = ctx.data.area(self.area);
        area.node_rings()
            .flat_map(|ring| ring.iter().skip(1))
            .map(|&node| ConnectorSpec::new(ctx.data.node_pos(node), GroundState::On, Some(node)))
            .collect()
    }

    /// The base of a building is level
    fn define_constraints(
        &self,
        _ctx: &WorldContext,
        own: &EleConnectorGroup,
        enforcer: &mut EleConstraintEnforcer,
    ) {
        if let Some((&first, rest)) = own.ids().split_first() {
            for &other in rest {
                enforcer.require_same_elevation(other, first);
            }
        }
    }

    fn terrain_boundaries(&self, data: &MapData) -> Vec<PolygonWithHoles> {
        vec![data.area(self.area).polygon.clone()]
    }

    fn outline(&self, data: &MapData) -> Option<PolygonWithHoles> {
        Some(data.area(self.area).polygon.clone())
    }

    fn render(&self, ctx: &WorldContext, elevations: &Elevations, target: &mut MeshTarget) {
        let base = elevations.min();
        let top = base + self.height;
        let polygon = &ctx.data.area(self.area).polygon;

        let wall_material = ctx.materials.surface("building_wall");
        let mut walls = TriangleGeometry::new(Vec::new(), wall_material.interpolation);
        for (part, floor) in self.floor_polygons(ctx) {
            for ring in part.rings() {
                walls.append(wall_geometry(ring, base + floor, top, wall_material));
            }
        }
        target.draw_mesh(Mesh::new(Geometry::Triangles(walls), wall_material.clone()));

        target.draw_triangles(ctx.materials.surface("roof"), flat_triangles(polygon, top, true));

        let floors: Vec<TriangleXYZ> = self
            .floor_polygons(ctx)
            .iter()
            .filter(|(_, floor)| *floor > 0.0)
            .flat_map(|(part, floor)| flat_triangles(part, base + floor, false))
            .collect();
        target.draw_triangles(ctx.materials.surface("building_floor"), floors);
    }
}
