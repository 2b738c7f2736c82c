use super::MeshProcessingStep;
use crate::mesh::{Geometry, Mesh, MeshStore, MeshWithMetadata, Transparency, TriangleGeometry};

/// Offset between stacked copies along the surface normal
pub const LAYER_OFFSET: f64 = 1e-3;

/// Replaces multi-layer materials with one mesh per layer, each copy shifted
/// slightly outwards. Layers above the first become alpha tested.
pub struct EmulateTextureLayers {
    max_layers: usize,
}

impl EmulateTextureLayers {
    pub fn new(max_layers: usize) -> Self {
        Self { max_layers: max_layers.max(1) }
    }
}

impl MeshProcessingStep for EmulateTextureLayers {
    fn name(&self) -> &'static str {
        "emulate_texture_layers"
    }

    fn apply(&self, store: &MeshStore) -> MeshStore {
        let mut result = Vec::with_capacity(store.len());
        for entry in store.meshes() {
            let material = &entry.mesh.material;
            if material.texture_layers.len() <= 1 {
                result.push(entry.clone());
                continue;
            }

            let base = entry.mesh.geometry.as_triangles(material);
            for (i, layer) in material.texture_layers.iter().take(self.max_layers).enumerate() {
                let offset = LAYER_OFFSET * i as f64;
                let mut geometry = TriangleGeometry {
                    triangles: base.triangles.iter().map(|t| t.shift(t.normal() * offset)).collect(),
                    normals: base.normals.clone(),
                    colors: base.colors.clone(),
                    tex_coords: base.tex_coords.get(i).cloned().into_iter().collect(),
                };
                if geometry.tex_coords.is_empty() {
                    geometry.tex_coords.push(vec![Default::default(); geometry.vertex_count()]);
                }

                let mut layer_material = material.with_layers(vec![layer.clone()]);
                if i > 0 && layer_material.transparency == Transparency::Opaque {
                    layer_material.transparency = Transparency::Binary;
                }
                result.push(MeshWithMetadata {
                    mesh: Mesh {
                        geometry: Geometry::Triangles(geometry),
                        material: layer_material,
                        ..entry.mesh.clone()
                    },
                    metadata: entry.metadata.clone(),
                });
            }
        }
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::processing::test_util::{entry, plain, triangle_mesh};
    use crate::mesh::{Color, TextureData, TextureLayer};

    fn layered(count: usize) -> MeshStore {
        let layers = (0..count)
            .map(|i| TextureLayer::new(TextureData::image(format!("layer{i}.png"), 1.0, 1.0)))
            .collect();
        vec![entry(triangle_mesh(0.0, plain(Color::WHITE).with_layers(layers)), 1)].into()
    }

    #[test]
    fn test_layers_become_stacked_meshes() {
        let result = EmulateTextureLayers::new(4).apply(&layered(3));
        assert_eq!(result.len(), 3);

        let heights: Vec<f64> = result
            .meshes()
            .iter()
            .map(|m| match &m.mesh.geometry {
                Geometry::Triangles(g) => g.triangles[0].v1.y,
                _ => panic!("expected triangles"),
            })
            .collect();
        assert!(heights[0].abs() < 1e-12);
        assert!((heights[1] - LAYER_OFFSET).abs() < 1e-12);
        assert!((heights[2] - 2.0 * LAYER_OFFSET).abs() < 1e-12);

        for (i, m) in result.meshes().iter().enumerate() {
            assert_eq!(m.mesh.material.texture_layers.len(), 1);
            let expected = if i == 0 { Transparency::Opaque } else { Transparency::Binary };
            assert_eq!(m.mesh.material.transparency, expected);
        }
    }

    #[test]
    fn test_layer_limit_and_single_layer_passthrough() {
        assert_eq!(EmulateTextureLayers::new(2).apply(&layered(3)).len(), 2);
        let single = layered(1);
        assert_eq!(EmulateTextureLayers::new(2).apply(&single).meshes(), single.meshes());
    }
}
