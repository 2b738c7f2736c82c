use std::collections::HashSet;
use std::sync::Arc;

use super::MeshProcessingStep;
use crate::mesh::{
    Geometry, Mesh, MeshStore, MeshWithMetadata, TextureAtlasGroup, TextureData, TextureLayer,
};

/// Replaces textures with references into shared atlases.
///
/// A layer is eligible when its base color is an image that is not excluded
/// and every mesh using it keeps its texture coordinates within [0, 1].
/// Repeating textures cannot live in an atlas.
pub struct ReplaceTexturesWithAtlas {
    exclude: Vec<String>,
    group: Option<Arc<TextureAtlasGroup>>,
}

impl ReplaceTexturesWithAtlas {
    pub fn new(exclude: Vec<String>) -> Self {
        Self { exclude, group: None }
    }

    /// Reuses an existing atlas group instead of building one from the input
    pub fn with_group(exclude: Vec<String>, group: Arc<TextureAtlasGroup>) -> Self {
        Self { exclude, group: Some(group) }
    }

    fn is_candidate(&self, layer: &TextureLayer) -> bool {
        match &layer.base_color {
            TextureData::Image { path, .. } => !self.exclude.iter().any(|e| e == path),
            _ => false,
        }
    }

    /// Builds the atlas group from all eligible layers of the store
    pub fn build_group(&self, store: &MeshStore) -> TextureAtlasGroup {
        let mut seen = Vec::new();
        let mut tiling = HashSet::new();
        for entry in store.meshes() {
            let material = &entry.mesh.material;
            let geometry = entry.mesh.geometry.as_triangles(material);
            for (i, layer) in material.texture_layers.iter().enumerate() {
                if !self.is_candidate(layer) {
                    continue;
                }
                let in_range = geometry.tex_coords.get(i).is_some_and(|coords| {
                    coords
                        .iter()
                        .all(|uv| (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y))
                });
                if !in_range {
                    tiling.insert(layer.clone());
                } else if !seen.contains(layer) {
                    seen.push(layer.clone());
                }
            }
        }
        TextureAtlasGroup::new(seen.iter().filter(|layer| !tiling.contains(*layer)))
    }

    fn replace(&self, mesh: &Mesh, group: &TextureAtlasGroup) -> Option<Mesh> {
        let material = &mesh.material;
        let slots: Vec<Option<usize>> = material
            .texture_layers
            .iter()
            .map(|layer| if self.is_candidate(layer) { group.slot_for(layer) } else { None })
            .collect();
        if slots.iter().all(Option::is_none) {
            return None;
        }

        let mut geometry = mesh.geometry.as_triangles(material);
        let in_range = slots.iter().enumerate().all(|(i, slot)| {
            slot.is_none()
                || geometry.tex_coords.get(i).is_some_and(|coords| {
                    coords
                        .iter()
                        .all(|uv| (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y))
                })
        });
        if !in_range {
            return None;
        }

        let mut layers = material.texture_layers.clone();
        for (i, slot) in slots.iter().enumerate() {
            let Some(slot) = *slot else { continue };
            let Some(replacement) = group.replacement_layer(slot) else { continue };
            layers[i] = replacement;
            for uv in &mut geometry.tex_coords[i] {
                *uv = group.map_tex_coord(slot, *uv);
            }
        }

        Some(Mesh {
            geometry: Geometry::Triangles(geometry),
            material: material.with_layers(layers),
            ..mesh.clone()
        })
    }
}

impl MeshProcessingStep for ReplaceTexturesWithAtlas {
    fn name(&self) -> &'static str {
        "replace_textures_with_atlas"
    }

    fn apply(&self, store: &MeshStore) -> MeshStore {
        let built;
        let group = match &self.group {
            Some(group) => group.as_ref(),
            None => {
                built = self.build_group(store);
                &built
            }
        };
        if group.is_empty() {
            return store.clone();
        }
        log::debug!("[Mesh] Atlas with {} textures", group.len());

        store
            .meshes()
            .iter()
            .map(|entry| match self.replace(&entry.mesh, group) {
                Some(mesh) => MeshWithMetadata { mesh, metadata: entry.metadata.clone() },
                None => entry.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DVec2;
    use crate::mesh::processing::test_util::{entry, plain, triangle_mesh};
    use crate::mesh::{Color, TriangleGeometry};

    fn textured(color: Color, path: &str) -> crate::mesh::Material {
        plain(color).with_layers(vec![TextureLayer::new(TextureData::image(path, 1.0, 1.0))])
    }

    fn atlas_of(mesh: &Mesh) -> Option<Arc<crate::mesh::TextureAtlas>> {
        match &mesh.material.texture_layers[0].base_color {
            TextureData::Atlas(atlas) => Some(atlas.clone()),
            _ => None,
        }
    }

    #[test]
    fn test_shared_atlas_for_distinct_materials() {
        let colors = [
            Color::new(1.0, 0.0, 0.0),
            Color::new(0.0, 1.0, 0.0),
            Color::new(0.0, 0.0, 1.0),
            Color::WHITE,
        ];
        let store: MeshStore = colors
            .iter()
            .enumerate()
            .map(|(i, c)| entry(triangle_mesh(i as f64 * 2.0, textured(*c, "stone.png")), i as i64))
            .collect();
        let result = ReplaceTexturesWithAtlas::new(Vec::new()).apply(&store);

        let atlases: Vec<_> = result.meshes().iter().map(|m| atlas_of(&m.mesh).unwrap()).collect();
        assert!(atlases.iter().all(|a| Arc::ptr_eq(a, &atlases[0])));
        assert_eq!(atlases[0].textures.len(), 1);
    }

    #[test]
    fn test_tex_coords_mapped_into_slot() {
        let store: MeshStore = vec![
            entry(triangle_mesh(0.0, textured(Color::WHITE, "a.png")), 1),
            entry(triangle_mesh(2.0, textured(Color::WHITE, "b.png")), 2),
        ]
        .into();
        let result = ReplaceTexturesWithAtlas::new(Vec::new()).apply(&store);
        match &result.meshes()[1].mesh.geometry {
            // 2 textures: 2 columns, 1 row, second slot starts at u = 0.5
            Geometry::Triangles(g) => {
                assert_eq!(g.tex_coords[0][0], DVec2::new(0.5, 0.0));
                assert_eq!(g.tex_coords[0][1], DVec2::new(1.0, 0.0));
            }
            _ => panic!("expected triangles"),
        }
    }

    #[test]
    fn test_tiling_and_excluded_textures_stay() {
        let tiling_material = textured(Color::WHITE, "tiles.png");
        let mut tiling_mesh = triangle_mesh(0.0, tiling_material.clone());
        if let Geometry::Triangles(g) = &mut tiling_mesh.geometry {
            g.tex_coords[0][2] = DVec2::new(0.0, 3.0);
        }
        let store: MeshStore = vec![
            entry(tiling_mesh, 1),
            entry(triangle_mesh(2.0, tiling_material), 2),
            entry(triangle_mesh(4.0, textured(Color::WHITE, "logo.png")), 3),
        ]
        .into();

        let result = ReplaceTexturesWithAtlas::new(vec!["logo.png".to_string()]).apply(&store);
        assert_eq!(result.meshes(), store.meshes());
    }

    #[test]
    fn test_untextured_meshes_pass_through() {
        let mesh = Mesh::new(
            Geometry::Triangles(TriangleGeometry::default()),
            plain(Color::WHITE),
        );
        let store: MeshStore = vec![entry(mesh, 1)].into();
        assert_eq!(ReplaceTexturesWithAtlas::new(Vec::new()).apply(&store).meshes(), store.meshes());
    }
}
