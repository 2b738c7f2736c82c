use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::MeshProcessingStep;
use crate::mesh::{
    Color, Geometry, GeometryType, Mesh, MeshMetadata, MeshStore, MeshWithMetadata,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOption {
    /// Merge meshes of different elements
    MergeElements,
    /// Keep flat and smooth shaded meshes apart
    SeparateNormalModes,
    /// Keep meshes with different material colors apart
    SingleColorMeshes,
    /// Only merge meshes that already are explicit triangles
    PreserveGeometryTypes,
}

/// Merges meshes that share a material (up to the configured differences),
/// level of detail range and, unless `MergeElements` is set, metadata
pub struct MergeMeshes {
    options: HashSet<MergeOption>,
}

impl MergeMeshes {
    pub fn new(options: impl IntoIterator<Item = MergeOption>) -> Self {
        Self { options: options.into_iter().collect() }
    }

    fn has(&self, option: MergeOption) -> bool {
        self.options.contains(&option)
    }

    pub fn should_be_merged(&self, a: &MeshWithMetadata, b: &MeshWithMetadata) -> bool {
        if a.mesh.lod_min != b.mesh.lod_min || a.mesh.lod_max != b.mesh.lod_max {
            return false;
        }
        if !self.has(MergeOption::MergeElements) && a.metadata != b.metadata {
            return false;
        }
        if self.has(MergeOption::PreserveGeometryTypes)
            && (a.mesh.geometry.geometry_type() != GeometryType::Triangles
                || b.mesh.geometry.geometry_type() != GeometryType::Triangles)
        {
            return false;
        }
        a.mesh.material.equals(
            &b.mesh.material,
            !self.has(MergeOption::SeparateNormalModes),
            !self.has(MergeOption::SingleColorMeshes),
        )
    }

    /// Bucket key. Meshes in different buckets are never merged.
    fn bucket(&self, entry: &MeshWithMetadata) -> u64 {
        let mut hasher = DefaultHasher::new();
        entry.mesh.material.texture_layers.hash(&mut hasher);
        let mut key = hasher.finish();
        if !self.has(MergeOption::MergeElements) {
            let mut hasher = DefaultHasher::new();
            entry.metadata.hash(&mut hasher);
            key ^= hasher.finish();
        }
        key
    }

    fn merge(&self, group: &[&MeshWithMetadata]) -> MeshWithMetadata {
        let first = group[0];
        if group.len() == 1 {
            return first.clone();
        }

        let bake_colors = group
            .iter()
            .any(|entry| entry.mesh.material.color != first.mesh.material.color);

        let mut merged = first.mesh.geometry.as_triangles(&first.mesh.material);
        if bake_colors {
            bake(&mut merged.colors, merged.triangles.len(), first.mesh.material.color);
        }
        for entry in &group[1..] {
            let mut geometry = entry.mesh.geometry.as_triangles(&entry.mesh.material);
            if bake_colors {
                bake(&mut geometry.colors, geometry.triangles.len(), entry.mesh.material.color);
            }
            merged.append(geometry);
        }

        let mut material = first.mesh.material.clone();
        if bake_colors {
            material.color = Color::WHITE;
        }
        let metadata = if group.iter().all(|entry| entry.metadata == first.metadata) {
            first.metadata.clone()
        } else {
            MeshMetadata::default()
        };

        MeshWithMetadata {
            mesh: Mesh {
                geometry: Geometry::Triangles(merged),
                material,
                ..first.mesh.clone()
            },
            metadata,
        }
    }
}

fn bake(colors: &mut Option<Vec<Color>>, triangle_count: usize, color: Color) {
    let baked = match colors.take() {
        Some(existing) => existing.into_iter().map(|c| c * color).collect(),
        None => vec![color; triangle_count * 3],
    };
    *colors = Some(baked);
}

impl MeshProcessingStep for MergeMeshes {
    fn name(&self) -> &'static str {
        "merge_meshes"
    }

    fn apply(&self, store: &MeshStore) -> MeshStore {
        let meshes = store.meshes();
        let mut buckets: IndexMap<u64, Vec<usize>> = IndexMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for (i, entry) in meshes.iter().enumerate() {
            let candidates = buckets.entry(self.bucket(entry)).or_default();
            let target = candidates
                .iter()
                .copied()
                .find(|&g| self.should_be_merged(&meshes[groups[g][0]], entry));
            match target {
                Some(g) => groups[g].push(i),
                None => {
                    candidates.push(groups.len());
                    groups.push(vec![i]);
                }
            }
        }

        groups
            .iter()
            .map(|group| {
                let members: Vec<&MeshWithMetadata> = group.iter().map(|&i| &meshes[i]).collect();
                self.merge(&members)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DVec3;
    use crate::mesh::processing::test_util::{entry, plain, triangle_mesh};
    use crate::mesh::{ExtrusionGeometry, Interpolation, LevelOfDetail, Material, TextureData, TextureLayer};

    fn geometry_of(entry: &MeshWithMetadata) -> &crate::mesh::TriangleGeometry {
        match &entry.mesh.geometry {
            Geometry::Triangles(g) => g,
            _ => panic!("expected triangles"),
        }
    }

    #[test]
    fn test_same_element_meshes_merge() {
        let store: MeshStore = vec![
            entry(triangle_mesh(0.0, plain(Color::WHITE)), 1),
            entry(triangle_mesh(2.0, plain(Color::WHITE)), 1),
            entry(triangle_mesh(4.0, plain(Color::WHITE)), 2),
        ]
        .into();

        let result = MergeMeshes::new([]).apply(&store);
        assert_eq!(result.len(), 2);
        assert_eq!(geometry_of(&result.meshes()[0]).len(), 2);
        assert_eq!(result.meshes()[0].metadata, store.meshes()[0].metadata);

        let all = MergeMeshes::new([MergeOption::MergeElements]).apply(&store);
        assert_eq!(all.len(), 1);
        assert_eq!(all.meshes()[0].metadata, MeshMetadata::default());
    }

    #[test]
    fn test_different_colors_are_baked() {
        let red = Color::new(1.0, 0.0, 0.0);
        let blue = Color::new(0.0, 0.0, 1.0);
        let store: MeshStore = vec![
            entry(triangle_mesh(0.0, plain(red)), 1),
            entry(triangle_mesh(2.0, plain(blue)), 1),
        ]
        .into();

        let result = MergeMeshes::new([]).apply(&store);
        assert_eq!(result.len(), 1);
        assert_eq!(result.meshes()[0].mesh.material.color, Color::WHITE);
        let colors = geometry_of(&result.meshes()[0]).colors.clone().unwrap();
        assert_eq!(colors[0], red);
        assert_eq!(colors[3], blue);

        assert_eq!(MergeMeshes::new([MergeOption::SingleColorMeshes]).apply(&store).len(), 2);
    }

    #[test]
    fn test_textures_and_lod_keep_meshes_apart() {
        let textured = plain(Color::WHITE)
            .with_layers(vec![TextureLayer::new(TextureData::image("t.png", 1.0, 1.0))]);
        let store: MeshStore = vec![
            entry(triangle_mesh(0.0, plain(Color::WHITE)), 1),
            entry(triangle_mesh(2.0, textured), 1),
            entry(
                triangle_mesh(4.0, plain(Color::WHITE)).with_lod_range(LevelOfDetail::Lod0, LevelOfDetail::Lod2),
                1,
            ),
        ]
        .into();
        assert_eq!(MergeMeshes::new([]).apply(&store).len(), 3);
    }

    #[test]
    fn test_normal_modes() {
        let store: MeshStore = vec![
            entry(triangle_mesh(0.0, plain(Color::WHITE)), 1),
            entry(triangle_mesh(2.0, Material::new(Interpolation::Smooth, Color::WHITE)), 1),
        ]
        .into();
        assert_eq!(MergeMeshes::new([]).apply(&store).len(), 1);
        assert_eq!(MergeMeshes::new([MergeOption::SeparateNormalModes]).apply(&store).len(), 2);
    }

    #[test]
    fn test_preserve_geometry_types() {
        let trunk = ExtrusionGeometry::vertical_circle(DVec3::ZERO, 0.3, 2.0, 1.0, 6);
        let store: MeshStore = vec![
            entry(triangle_mesh(0.0, plain(Color::WHITE)), 1),
            entry(Mesh::new(Geometry::Extrusion(trunk), plain(Color::WHITE)), 1),
        ]
        .into();
        assert_eq!(MergeMeshes::new([]).apply(&store).len(), 1);
        assert_eq!(MergeMeshes::new([MergeOption::PreserveGeometryTypes]).apply(&store).len(), 2);
    }

    #[test]
    fn test_merging_is_idempotent() {
        let store: MeshStore = (0..6)
            .map(|i| {
                let color = if i % 2 == 0 { Color::WHITE } else { Color::new(0.5, 0.5, 0.5) };
                entry(triangle_mesh(i as f64 * 2.0, plain(color)), i % 3)
            })
            .collect();
        let step = MergeMeshes::new([]);
        let once = step.apply(&store);
        let twice = step.apply(&once);
        assert_eq!(once.len(), 3);
        assert_eq!(twice.meshes(), once.meshes());
        for (i, a) in once.meshes().iter().enumerate() {
            for b in &once.meshes()[i + 1..] {
                assert!(!step.should_be_merged(a, b));
            }
        }
    }
}
