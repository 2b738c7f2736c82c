//! Meshes with their metadata and the processing entry point

use std::time::Instant;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::geometry::Geometry;
use super::material::Material;
use super::processing::MeshProcessingStep;
use crate::map_data::ElementId;

/// Level of detail, from coarsest to finest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelOfDetail {
    Lod0,
    Lod1,
    Lod2,
    Lod3,
    Lod4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: Material,
    pub lod_min: LevelOfDetail,
    pub lod_max: LevelOfDetail,
}

impl Mesh {
    /// Mesh visible at every level of detail
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            geometry,
            material,
            lod_min: LevelOfDetail::Lod0,
            lod_max: LevelOfDetail::Lod4,
        }
    }

    pub fn with_lod_range(mut self, min: LevelOfDetail, max: LevelOfDetail) -> Self {
        self.lod_min = min.min(max);
        self.lod_max = min.max(max);
        self
    }

    pub fn is_visible_at(&self, lod: LevelOfDetail) -> bool {
        self.lod_min <= lod && lod <= self.lod_max
    }
}

/// Source element and object type a mesh was created for
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MeshMetadata {
    pub element: Option<ElementId>,
    pub object_type: Option<&'static str>,
}

impl MeshMetadata {
    pub fn new(element: ElementId, object_type: &'static str) -> Self {
        Self {
            element: Some(element),
            object_type: Some(object_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshWithMetadata {
    pub mesh: Mesh,
    pub metadata: MeshMetadata,
}

/// Ordered collection of meshes
#[derive(Debug, Clone, Default)]
pub struct MeshStore {
    meshes: Vec<MeshWithMetadata>,
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mesh: Mesh, metadata: MeshMetadata) {
        self.meshes.push(MeshWithMetadata { mesh, metadata });
    }

    pub fn meshes(&self) -> &[MeshWithMetadata] {
        &self.meshes
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn into_meshes(self) -> Vec<MeshWithMetadata> {
        self.meshes
    }

    /// Meshes grouped by metadata, groups in order of first appearance
    pub fn meshes_by_metadata(&self) -> IndexMap<&MeshMetadata, Vec<&Mesh>> {
        let mut groups: IndexMap<&MeshMetadata, Vec<&Mesh>> = IndexMap::new();
        for entry in &self.meshes {
            groups.entry(&entry.metadata).or_default().push(&entry.mesh);
        }
        groups
    }

    /// Runs the steps in order, each producing a new store
    pub fn process(&self, steps: &[Box<dyn MeshProcessingStep>]) -> MeshStore {
        let mut store = self.clone();
        for step in steps {
            let start = Instant::now();
            let before = store.len();
            store = step.apply(&store);
            log::info!(
                "[Mesh] {}: {} -> {} meshes in {:?}",
                step.name(),
                before,
                store.len(),
                start.elapsed()
            );
        }
        store
    }
}

impl From<Vec<MeshWithMetadata>> for MeshStore {
    fn from(meshes: Vec<MeshWithMetadata>) -> Self {
        Self { meshes }
    }
}

impl FromIterator<MeshWithMetadata> for MeshStore {
    fn from_iter<I: IntoIterator<Item = MeshWithMetadata>>(iter: I) -> Self {
        Self { meshes: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_data::ElementKind;
    use crate::math::{DVec3, TriangleXYZ};
    use crate::mesh::{Color, Interpolation, TriangleGeometry};

    fn mesh() -> Mesh {
        let triangle = TriangleXYZ::new(DVec3::ZERO, DVec3::X, DVec3::Z);
        Mesh::new(
            Geometry::Triangles(TriangleGeometry::new(vec![triangle], Interpolation::Flat)),
            Material::new(Interpolation::Flat, Color::WHITE),
        )
    }

    #[test]
    fn test_lod_range_is_ordered() {
        let m = mesh().with_lod_range(LevelOfDetail::Lod3, LevelOfDetail::Lod1);
        assert_eq!(m.lod_min, LevelOfDetail::Lod1);
        assert_eq!(m.lod_max, LevelOfDetail::Lod3);
        assert!(m.is_visible_at(LevelOfDetail::Lod2));
        assert!(!m.is_visible_at(LevelOfDetail::Lod4));
    }

    #[test]
    fn test_meshes_by_metadata_keeps_first_appearance_order() {
        let a = MeshMetadata::new(ElementId::new(ElementKind::Way, 2), "Building");
        let b = MeshMetadata::new(ElementId::new(ElementKind::Way, 1), "Road");
        let mut store = MeshStore::new();
        store.add(mesh(), a.clone());
        store.add(mesh(), b.clone());
        store.add(mesh(), a.clone());

        let groups = store.meshes_by_metadata();
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec![&a, &b]);
        assert_eq!(groups[&a].len(), 2);
    }

    #[test]
    fn test_process_without_steps_is_identity() {
        let mut store = MeshStore::new();
        store.add(mesh(), MeshMetadata::default());
        let processed = store.process(&[]);
        assert_eq!(processed.meshes(), store.meshes());
    }
}
