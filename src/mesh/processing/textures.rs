use super::MeshProcessingStep;
use crate::error::ConversionError;
use crate::mesh::{Geometry, Mesh, MeshStore, MeshWithMetadata, TextureType};

/// Strips texture channels from every layer. The base color cannot be removed.
pub struct RemoveTextures {
    types: Vec<TextureType>,
}

impl RemoveTextures {
    pub fn new(types: Vec<TextureType>) -> Result<Self, ConversionError> {
        if types.contains(&TextureType::BaseColor) {
            return Err(ConversionError::InvalidConfig(
                "base color textures cannot be removed".to_string(),
            ));
        }
        Ok(Self { types })
    }
}

impl MeshProcessingStep for RemoveTextures {
    fn name(&self) -> &'static str {
        "remove_textures"
    }

    fn apply(&self, store: &MeshStore) -> MeshStore {
        store
            .meshes()
            .iter()
            .map(|entry| {
                let mut entry = entry.clone();
                for layer in &mut entry.mesh.material.texture_layers {
                    for texture_type in &self.types {
                        *layer = layer.with(*texture_type, None);
                    }
                }
                entry
            })
            .collect()
    }
}

/// Converts every geometry into explicit triangles
pub struct TriangulateGeometry;

impl MeshProcessingStep for TriangulateGeometry {
    fn name(&self) -> &'static str {
        "triangulate_geometry"
    }

    fn apply(&self, store: &MeshStore) -> MeshStore {
        store
            .meshes()
            .iter()
            .map(|entry| match &entry.mesh.geometry {
                Geometry::Triangles(_) => entry.clone(),
                geometry => MeshWithMetadata {
                    mesh: Mesh {
                        geometry: Geometry::Triangles(geometry.as_triangles(&entry.mesh.material)),
                        ..entry.mesh.clone()
                    },
                    metadata: entry.metadata.clone(),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DVec3;
    use crate::mesh::processing::test_util::{entry, plain, triangle_mesh};
    use crate::mesh::{Color, GeometryType, Shape, ShapeGeometry, TextureData, TextureLayer};

    #[test]
    fn test_remove_normal_maps() {
        let layer = TextureLayer::new(TextureData::image("a.png", 1.0, 1.0))
            .with(TextureType::Normal, Some(TextureData::image("a_n.png", 1.0, 1.0)))
            .with(TextureType::Orm, Some(TextureData::image("a_orm.png", 1.0, 1.0)));
        let store: MeshStore =
            vec![entry(triangle_mesh(0.0, plain(Color::WHITE).with_layers(vec![layer])), 1)].into();

        let result = RemoveTextures::new(vec![TextureType::Normal]).unwrap().apply(&store);
        let layer = &result.meshes()[0].mesh.material.texture_layers[0];
        assert!(layer.normal.is_none());
        assert!(layer.orm.is_some());
        assert_eq!(layer.base_color, TextureData::image("a.png", 1.0, 1.0));
    }

    #[test]
    fn test_base_color_is_rejected() {
        assert!(RemoveTextures::new(vec![TextureType::Orm, TextureType::BaseColor]).is_err());
    }

    #[test]
    fn test_triangulate_shapes() {
        let shape = ShapeGeometry::new(Shape::Box {
            base: DVec3::ZERO,
            size: DVec3::ONE,
            rotation: 0.5,
        });
        let store: MeshStore = vec![
            entry(Mesh::new(Geometry::Shape(shape), plain(Color::WHITE)), 1),
            entry(triangle_mesh(0.0, plain(Color::WHITE)), 2),
        ]
        .into();
        let result = TriangulateGeometry.apply(&store);
        assert!(result
            .meshes()
            .iter()
            .all(|m| m.mesh.geometry.geometry_type() == GeometryType::Triangles));
        assert_eq!(result.meshes()[1], store.meshes()[1]);
    }
}
