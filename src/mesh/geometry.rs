//! Mesh geometry: explicit triangles or shapes that triangulate on demand

use std::collections::HashMap;
use std::f64::consts::TAU;

use super::material::{Color, Interpolation, Material, TextureLayer};
use crate::math::{DVec2, DVec3, TriangleXYZ};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Triangles,
    Extrusion,
    Shape,
}

/// Triangles with resolved normals. Per-vertex arrays hold three entries per triangle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriangleGeometry {
    pub triangles: Vec<TriangleXYZ>,
    pub normals: Vec<DVec3>,
    /// `None` means every vertex is white
    pub colors: Option<Vec<Color>>,
    /// One list per texture layer
    pub tex_coords: Vec<Vec<DVec2>>,
}

impl TriangleGeometry {
    /// Geometry with normals resolved for the interpolation mode.
    /// Smooth normals are averaged over all triangles sharing a vertex position.
    pub fn new(triangles: Vec<TriangleXYZ>, interpolation: Interpolation) -> Self {
        let normals = match interpolation {
            Interpolation::Flat => triangles.iter().flat_map(|t| [t.normal(); 3]).collect(),
            Interpolation::Smooth => smooth_normals(&triangles),
        };
        Self {
            triangles,
            normals,
            colors: None,
            tex_coords: Vec::new(),
        }
    }

    pub fn with_colors(mut self, colors: Vec<Color>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_tex_coords(mut self, tex_coords: Vec<Vec<DVec2>>) -> Self {
        self.tex_coords = tex_coords;
        self
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.triangles.len() * 3
    }

    /// Vertex colors, with white filled in when none are stored
    pub fn colors_or_white(&self) -> Vec<Color> {
        self.colors
            .clone()
            .unwrap_or_else(|| vec![Color::WHITE; self.vertex_count()])
    }

    /// Keeps the triangles for which `keep` returns true, with their vertex attributes
    pub fn retain(&mut self, mut keep: impl FnMut(&TriangleXYZ) -> bool) {
        let mask: Vec<bool> = self.triangles.iter().map(&mut keep).collect();
        filter_vertices(&mask, &mut self.normals);
        if let Some(colors) = &mut self.colors {
            filter_vertices(&mask, colors);
        }
        for layer in &mut self.tex_coords {
            filter_vertices(&mask, layer);
        }
        let mut i = 0;
        self.triangles.retain(|_| {
            let kept = mask[i];
            i += 1;
            kept
        });
    }

    /// Appends another geometry. Missing colors become white, missing layers become zero.
    pub fn append(&mut self, mut other: TriangleGeometry) {
        if self.colors.is_some() || other.colors.is_some() {
            let mut colors = self.colors_or_white();
            colors.extend(other.colors_or_white());
            self.colors = Some(colors);
        }
        let layers = self.tex_coords.len().max(other.tex_coords.len());
        let own_vertices = self.vertex_count();
        let other_vertices = other.vertex_count();
        self.tex_coords.resize(layers, vec![DVec2::ZERO; own_vertices]);
        other.tex_coords.resize(layers, vec![DVec2::ZERO; other_vertices]);
        for (own, theirs) in self.tex_coords.iter_mut().zip(other.tex_coords) {
            own.extend(theirs);
        }
        self.triangles.extend(other.triangles);
        self.normals.extend(other.normals);
    }
}

/// Keeps the per-vertex entries whose triangle is set in `mask`
fn filter_vertices<T>(mask: &[bool], values: &mut Vec<T>) {
    let mut i = 0;
    values.retain(|_| {
        let kept = mask[i / 3];
        i += 1;
        kept
    });
}

fn smooth_normals(triangles: &[TriangleXYZ]) -> Vec<DVec3> {
    let key = |v: DVec3| (v.x.to_bits(), v.y.to_bits(), v.z.to_bits());
    let mut sums: HashMap<(u64, u64, u64), DVec3> = HashMap::new();
    for triangle in triangles {
        let weighted = triangle.normal() * triangle.area();
        for v in triangle.vertices() {
            *sums.entry(key(v)).or_insert(DVec3::ZERO) += weighted;
        }
    }
    triangles
        .iter()
        .flat_map(|t| {
            t.vertices().map(|v| {
                let sum = sums.get(&key(v)).copied().unwrap_or(DVec3::ZERO);
                let normal = sum.normalize_or_zero();
                if normal == DVec3::ZERO { t.normal() } else { normal }
            })
        })
        .collect()
}

/// Texture coordinates projected from the ground plane, one texture repetition per texture size
pub fn global_xz_tex_coords(triangles: &[TriangleXYZ], layers: &[TextureLayer]) -> Vec<Vec<DVec2>> {
    layers
        .iter()
        .map(|layer| {
            let (width, height) = layer.base_color.dimensions();
            triangles
                .iter()
                .flat_map(|t| t.vertices())
                .map(|v| DVec2::new(v.x / width, v.z / height))
                .collect()
        })
        .collect()
}

/// A closed profile swept along a path, scaled per path point
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrusionGeometry {
    /// Closed ring in the plane across the path, without repeated first point
    pub profile: Vec<DVec2>,
    pub path: Vec<DVec3>,
    /// Scale of the profile at each path point
    pub scale: Vec<f64>,
    pub color: Option<Color>,
    pub cap_start: bool,
    pub cap_end: bool,
}

impl ExtrusionGeometry {
    /// Vertical prism or cone over a circle, as used for trunks and crowns
    pub fn vertical_circle(base: DVec3, radius: f64, height: f64, top_scale: f64, segments: usize) -> Self {
        let segments = segments.max(3);
        let profile = (0..segments)
            .map(|i| {
                let angle = TAU * i as f64 / segments as f64;
                DVec2::new(angle.cos() * radius, angle.sin() * radius)
            })
            .collect();
        Self {
            profile,
            path: vec![base, base + DVec3::Y * height],
            scale: vec![1.0, top_scale],
            color: None,
            cap_start: true,
            cap_end: top_scale > 0.0,
        }
    }

    fn rings(&self) -> Vec<Vec<DVec3>> {
        let n = self.path.len();
        (0..n)
            .map(|i| {
                let forward = if i + 1 < n {
                    self.path[i + 1] - self.path[i]
                } else {
                    self.path[i] - self.path[i.saturating_sub(1)]
                }
                .normalize_or_zero();
                let mut right = forward.cross(DVec3::Y);
                if right.length_squared() < 1e-12 {
                    right = DVec3::X;
                }
                let right = right.normalize();
                let across = right.cross(forward).normalize_or_zero();
                let scale = self.scale.get(i).copied().unwrap_or(1.0);
                self.profile
                    .iter()
                    .map(|p| self.path[i] + (right * p.x + across * p.y) * scale)
                    .collect()
            })
            .collect()
    }

    fn triangles(&self) -> (Vec<TriangleXYZ>, Vec<[DVec2; 3]>) {
        let mut triangles = Vec::new();
        let mut uvs = Vec::new();
        if self.path.len() < 2 || self.profile.len() < 3 {
            return (triangles, uvs);
        }
        let rings = self.rings();
        let centroid = self.path.iter().sum::<DVec3>() / self.path.len() as f64;
        let n = self.profile.len();
        let m = rings.len();

        let mut push = |t: TriangleXYZ, uv: [DVec2; 3], outward_from: DVec3| {
            if t.is_degenerate_or_nan() {
                return;
            }
            if t.normal().dot(t.center() - outward_from) < 0.0 {
                triangles.push(t.reversed());
                uvs.push([uv[0], uv[2], uv[1]]);
            } else {
                triangles.push(t);
                uvs.push(uv);
            }
        };

        for i in 0..m - 1 {
            let v0 = i as f64 / (m - 1) as f64;
            let v1 = (i + 1) as f64 / (m - 1) as f64;
            let axis_point = (self.path[i] + self.path[i + 1]) / 2.0;
            for j in 0..n {
                let k = (j + 1) % n;
                let u0 = j as f64 / n as f64;
                let u1 = (j + 1) as f64 / n as f64;
                let (a, b, c, d) = (rings[i][j], rings[i][k], rings[i + 1][k], rings[i + 1][j]);
                let (ta, tb, tc, td) = (
                    DVec2::new(u0, v0),
                    DVec2::new(u1, v0),
                    DVec2::new(u1, v1),
                    DVec2::new(u0, v1),
                );
                push(TriangleXYZ::new(a, b, c), [ta, tb, tc], axis_point);
                push(TriangleXYZ::new(a, c, d), [ta, tc, td], axis_point);
            }
        }

        let min = self.profile.iter().fold(DVec2::splat(f64::INFINITY), |a, p| a.min(*p));
        let max = self.profile.iter().fold(DVec2::splat(f64::NEG_INFINITY), |a, p| a.max(*p));
        let extent = (max - min).max(DVec2::splat(1e-12));

        // caps assume a convex profile
        for (enabled, ring) in [(self.cap_start, &rings[0]), (self.cap_end, &rings[m - 1])] {
            if !enabled {
                continue;
            }
            for j in 1..n - 1 {
                let t = TriangleXYZ::new(ring[0], ring[j], ring[j + 1]);
                let uv = [self.profile[0], self.profile[j], self.profile[j + 1]].map(|p| (p - min) / extent);
                push(t, uv, centroid);
            }
        }
        (triangles, uvs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Box standing on `base`, rotated around the vertical axis
    Box { base: DVec3, size: DVec3, rotation: f64 },
    Sphere { center: DVec3, radius: f64, segments: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeGeometry {
    pub shape: Shape,
    pub color: Option<Color>,
}

impl ShapeGeometry {
    pub fn new(shape: Shape) -> Self {
        Self { shape, color: None }
    }

    fn triangles(&self) -> (Vec<TriangleXYZ>, Vec<[DVec2; 3]>) {
        match &self.shape {
            Shape::Box { base, size, rotation } => {
                let (sin, cos) = rotation.sin_cos();
                let corner = |dx: f64, dz: f64| {
                    let x = dx * size.x / 2.0;
                    let z = dz * size.z / 2.0;
                    DVec3::new(base.x + x * cos - z * sin, base.y, base.z + x * sin + z * cos)
                };
                let bottom = [corner(-1.0, -1.0), corner(1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0)];
                let top = bottom.map(|v| v + DVec3::Y * size.y);
                let center = *base + DVec3::Y * size.y / 2.0;
                let mut triangles = Vec::new();
                let mut uvs = Vec::new();
                let uv = [DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0), DVec2::new(1.0, 1.0), DVec2::new(0.0, 1.0)];
                let mut quad = |q: [DVec3; 4]| {
                    for (t, uv) in [
                        (TriangleXYZ::new(q[0], q[1], q[2]), [uv[0], uv[1], uv[2]]),
                        (TriangleXYZ::new(q[0], q[2], q[3]), [uv[0], uv[2], uv[3]]),
                    ] {
                        if t.normal().dot(t.center() - center) < 0.0 {
                            triangles.push(t.reversed());
                            uvs.push([uv[0], uv[2], uv[1]]);
                        } else {
                            triangles.push(t);
                            uvs.push(uv);
                        }
                    }
                };
                for i in 0..4 {
                    let j = (i + 1) % 4;
                    quad([bottom[i], bottom[j], top[j], top[i]]);
                }
                quad(bottom);
                quad(top);
                (triangles, uvs)
            }
            Shape::Sphere { center, radius, segments } => {
                let segments = (*segments).max(4);
                let rings = segments / 2;
                let point = |ring: usize, segment: usize| {
                    let polar = std::f64::consts::PI * ring as f64 / rings as f64;
                    let azimuth = TAU * segment as f64 / segments as f64;
                    *center
                        + DVec3::new(
                            polar.sin() * azimuth.cos(),
                            polar.cos(),
                            polar.sin() * azimuth.sin(),
                        ) * *radius
                };
                let uv = |ring: usize, segment: usize| {
                    DVec2::new(segment as f64 / segments as f64, ring as f64 / rings as f64)
                };
                let mut triangles = Vec::new();
                let mut uvs = Vec::new();
                for r in 0..rings {
                    for s in 0..segments {
                        let candidates = [
                            ([(r, s), (r + 1, s), (r + 1, s + 1)]),
                            ([(r, s), (r + 1, s + 1), (r, s + 1)]),
                        ];
                        for corners in candidates {
                            let t = TriangleXYZ::new(
                                point(corners[0].0, corners[0].1),
                                point(corners[1].0, corners[1].1),
                                point(corners[2].0, corners[2].1),
                            );
                            if t.is_degenerate_or_nan() {
                                continue;
                            }
                            let uv = corners.map(|(r, s)| uv(r, s));
                            if t.normal().dot(t.center() - *center) < 0.0 {
                                triangles.push(t.reversed());
                                uvs.push([uv[0], uv[2], uv[1]]);
                            } else {
                                triangles.push(t);
                                uvs.push(uv);
                            }
                        }
                    }
                }
                (triangles, uvs)
            }
        }
    }
}

/// Geometry of a mesh
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Triangles(TriangleGeometry),
    Extrusion(ExtrusionGeometry),
    Shape(ShapeGeometry),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Triangles(_) => GeometryType::Triangles,
            Geometry::Extrusion(_) => GeometryType::Extrusion,
            Geometry::Shape(_) => GeometryType::Shape,
        }
    }

    /// Explicit triangles for this geometry. Shapes get one set of
    /// texture coordinates in [0, 1] per texture layer of `material`.
    pub fn as_triangles(&self, material: &Material) -> TriangleGeometry {
        let (triangles, uvs, color) = match self {
            Geometry::Triangles(geometry) => return geometry.clone(),
            Geometry::Extrusion(extrusion) => {
                let (triangles, uvs) = extrusion.triangles();
                (triangles, uvs, extrusion.color)
            }
            Geometry::Shape(shape) => {
                let (triangles, uvs) = shape.triangles();
                (triangles, uvs, shape.color)
            }
        };
        let flat_uvs: Vec<DVec2> = uvs.into_iter().flatten().collect();
        let tex_coords = vec![flat_uvs; material.texture_layers.len()];
        let mut geometry = TriangleGeometry::new(triangles, material.interpolation).with_tex_coords(tex_coords);
        if let Some(color) = color {
            geometry.colors = Some(vec![color; geometry.vertex_count()]);
        }
        geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::TextureData;

    fn flat_material() -> Material {
        Material::new(Interpolation::Flat, Color::WHITE)
    }

    fn ground_triangle(offset: f64) -> TriangleXYZ {
        TriangleXYZ::new(
            DVec3::new(offset, 0.0, 0.0),
            DVec3::new(offset + 1.0, 0.0, 0.0),
            DVec3::new(offset, 0.0, 1.0),
        )
    }

    #[test]
    fn test_flat_normals_per_vertex() {
        let geometry = TriangleGeometry::new(vec![ground_triangle(0.0)], Interpolation::Flat);
        assert_eq!(geometry.normals.len(), 3);
        assert!(geometry.normals.iter().all(|n| n.y.abs() > 0.99));
    }

    #[test]
    fn test_retain_keeps_attributes_aligned() {
        let mut geometry = TriangleGeometry::new(
            vec![ground_triangle(0.0), ground_triangle(5.0)],
            Interpolation::Flat,
        )
        .with_colors(vec![
            Color::WHITE,
            Color::WHITE,
            Color::WHITE,
            Color::new(1.0, 0.0, 0.0),
            Color::new(1.0, 0.0, 0.0),
            Color::new(1.0, 0.0, 0.0),
        ])
        .with_tex_coords(vec![vec![
            DVec2::ZERO,
            DVec2::ZERO,
            DVec2::ZERO,
            DVec2::ONE,
            DVec2::ONE,
            DVec2::ONE,
        ]]);
        geometry.retain(|t| t.center().x > 2.0);
        assert_eq!(geometry.len(), 1);
        assert_eq!(geometry.normals.len(), 3);
        assert_eq!(geometry.colors.as_ref().unwrap()[0], Color::new(1.0, 0.0, 0.0));
        assert_eq!(geometry.tex_coords[0], vec![DVec2::ONE; 3]);
    }

    #[test]
    fn test_append_fills_missing_colors() {
        let mut a = TriangleGeometry::new(vec![ground_triangle(0.0)], Interpolation::Flat);
        let b = TriangleGeometry::new(vec![ground_triangle(2.0)], Interpolation::Flat)
            .with_colors(vec![Color::new(0.0, 0.0, 1.0); 3]);
        a.append(b);
        let colors = a.colors.unwrap();
        assert_eq!(colors.len(), 6);
        assert_eq!(colors[0], Color::WHITE);
        assert_eq!(colors[5], Color::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_trunk_extrusion_faces_outward() {
        let trunk = ExtrusionGeometry::vertical_circle(DVec3::ZERO, 0.5, 4.0, 1.0, 8);
        let geometry = Geometry::Extrusion(trunk).as_triangles(&flat_material());
        // 8 side quads and two fans of 6 triangles
        assert_eq!(geometry.len(), 16 + 12);
        let axis = |p: DVec3| DVec3::new(0.0, p.y, 0.0);
        for t in &geometry.triangles {
            let normal = t.normal();
            if normal.y.abs() < 0.5 {
                assert!(normal.dot(t.center() - axis(t.center())) > 0.0);
            }
        }
    }

    #[test]
    fn test_cone_has_no_top_cap() {
        let crown = ExtrusionGeometry::vertical_circle(DVec3::ZERO, 2.0, 5.0, 0.0, 6);
        assert!(!crown.cap_end);
        let geometry = Geometry::Extrusion(crown).as_triangles(&flat_material());
        // 6 side triangles survive, the upper halves of the quads collapse to lines
        assert_eq!(geometry.len(), 6 + 4);
    }

    #[test]
    fn test_box_shape() {
        let shape = ShapeGeometry::new(Shape::Box {
            base: DVec3::ZERO,
            size: DVec3::new(2.0, 3.0, 4.0),
            rotation: 0.0,
        });
        let geometry = Geometry::Shape(shape).as_triangles(&flat_material());
        assert_eq!(geometry.len(), 12);
        let area: f64 = geometry.triangles.iter().map(|t| t.area()).sum();
        assert!((area - 2.0 * (2.0 * 3.0 + 3.0 * 4.0 + 2.0 * 4.0)).abs() < 1e-9);
        let top = geometry.triangles.iter().find(|t| t.center().y > 2.9).unwrap();
        assert!(top.normal().y > 0.99);
    }

    #[test]
    fn test_shape_tex_coords_in_unit_range() {
        let material = flat_material().with_layers(vec![TextureLayer::new(TextureData::Blank)]);
        let shape = ShapeGeometry::new(Shape::Sphere { center: DVec3::ZERO, radius: 1.0, segments: 8 });
        let geometry = Geometry::Shape(shape).as_triangles(&material);
        assert_eq!(geometry.tex_coords.len(), 1);
        assert_eq!(geometry.tex_coords[0].len(), geometry.vertex_count());
        assert!(geometry.tex_coords[0]
            .iter()
            .all(|uv| (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y)));
    }
}
