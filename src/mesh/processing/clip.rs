use super::MeshProcessingStep;
use crate::math::{xz, SimplePolygon};
use crate::mesh::{Geometry, Mesh, MeshStore, MeshWithMetadata};

/// Removes triangles whose centroid lies outside a ground-plane polygon.
/// Meshes left without triangles are dropped.
pub struct ClipToBounds {
    bounds: SimplePolygon,
}

impl ClipToBounds {
    pub fn new(bounds: SimplePolygon) -> Self {
        Self { bounds }
    }
}

impl MeshProcessingStep for ClipToBounds {
    fn name(&self) -> &'static str {
        "clip_to_bounds"
    }

    fn apply(&self, store: &MeshStore) -> MeshStore {
        store
            .meshes()
            .iter()
            .filter_map(|entry| {
                let mut geometry = entry.mesh.geometry.as_triangles(&entry.mesh.material);
                geometry.retain(|t| self.bounds.contains_or_touches(xz(t.center())));
                if geometry.is_empty() {
                    return None;
                }
                Some(MeshWithMetadata {
                    mesh: Mesh {
                        geometry: Geometry::Triangles(geometry),
                        ..entry.mesh.clone()
                    },
                    metadata: entry.metadata.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{AxisAlignedRectangle, DVec3, TriangleXYZ};
    use crate::mesh::processing::test_util::{entry, plain, triangle, triangle_mesh};
    use crate::mesh::{Color, Interpolation, TriangleGeometry};

    #[test]
    fn test_clip_by_centroid() {
        let bounds = AxisAlignedRectangle::new(-1.0, -1.0, 3.0, 3.0).to_polygon().unwrap();
        let geometry = TriangleGeometry::new(
            vec![triangle(0.0), triangle(2.5), triangle(10.0)],
            Interpolation::Flat,
        );
        let store: MeshStore = vec![
            entry(Mesh::new(Geometry::Triangles(geometry), plain(Color::WHITE)), 1),
            entry(triangle_mesh(20.0, plain(Color::WHITE)), 2),
        ]
        .into();

        let result = ClipToBounds::new(bounds).apply(&store);
        assert_eq!(result.len(), 1);
        match &result.meshes()[0].mesh.geometry {
            // the triangle at 2.5 reaches past the boundary but its centroid is inside
            Geometry::Triangles(g) => assert_eq!(g.len(), 2),
            _ => panic!("expected triangles"),
        }
    }

    #[test]
    fn test_vertical_triangles_use_ground_position() {
        let bounds = AxisAlignedRectangle::new(0.0, 0.0, 1.0, 1.0).to_polygon().unwrap();
        let wall = TriangleXYZ::new(
            DVec3::new(0.2, 0.0, 0.5),
            DVec3::new(0.8, 0.0, 0.5),
            DVec3::new(0.5, 50.0, 0.5),
        );
        let geometry = TriangleGeometry::new(vec![wall], Interpolation::Flat);
        let store: MeshStore =
            vec![entry(Mesh::new(Geometry::Triangles(geometry), plain(Color::WHITE)), 1)].into();
        assert_eq!(ClipToBounds::new(bounds).apply(&store).len(), 1);
    }
}
