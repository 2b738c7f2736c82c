//! Collects meshes emitted by world objects

use super::geometry::{global_xz_tex_coords, Geometry, TriangleGeometry};
use super::material::Material;
use super::store::{Mesh, MeshMetadata, MeshStore};
use crate::math::TriangleXYZ;

/// Receives meshes from world objects, tagging each with the metadata of
/// the object currently being drawn
#[derive(Debug, Default)]
pub struct MeshTarget {
    store: MeshStore,
    current: MeshMetadata,
}

impl MeshTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_object(&mut self, metadata: MeshMetadata) {
        self.current = metadata;
    }

    pub fn draw_mesh(&mut self, mesh: Mesh) {
        if let Geometry::Triangles(geometry) = &mesh.geometry {
            if geometry.is_empty() {
                return;
            }
        }
        self.store.add(mesh, self.current.clone());
    }

    /// Draws triangles with ground-plane texture coordinates for every layer of `material`
    pub fn draw_triangles(&mut self, material: &Material, triangles: Vec<TriangleXYZ>) {
        let triangles: Vec<_> = triangles.into_iter().filter(|t| !t.is_degenerate_or_nan()).collect();
        let tex_coords = global_xz_tex_coords(&triangles, &material.texture_layers);
        let geometry = TriangleGeometry::new(triangles, material.interpolation).with_tex_coords(tex_coords);
        self.draw_mesh(Mesh::new(Geometry::Triangles(geometry), material.clone()));
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn finish(self) -> MeshStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_data::{ElementId, ElementKind};
    use crate::math::DVec3;
    use crate::mesh::{Color, Interpolation, TextureData, TextureLayer};

    #[test]
    fn test_meshes_carry_current_object() {
        let material = Material::new(Interpolation::Flat, Color::WHITE)
            .with_layers(vec![TextureLayer::new(TextureData::image("g.png", 2.0, 2.0))]);
        let triangle = TriangleXYZ::new(DVec3::ZERO, DVec3::new(4.0, 0.0, 0.0), DVec3::new(0.0, 0.0, 4.0));
        let degenerate = TriangleXYZ::new(DVec3::ZERO, DVec3::ZERO, DVec3::X);

        let mut target = MeshTarget::new();
        let id = ElementId::new(ElementKind::Way, 9);
        target.begin_object(MeshMetadata::new(id, "SurfaceArea"));
        target.draw_triangles(&material, vec![triangle, degenerate]);
        target.draw_triangles(&material, vec![degenerate]);
        assert_eq!(target.len(), 1);

        let store = target.finish();
        let entry = &store.meshes()[0];
        assert_eq!(entry.metadata.element, Some(id));
        match &entry.mesh.geometry {
            Geometry::Triangles(g) => {
                assert_eq!(g.len(), 1);
                assert_eq!(g.tex_coords[0][1].x, 2.0);
            }
            _ => panic!("expected triangles"),
        }
    }
}
