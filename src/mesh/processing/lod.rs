use super::MeshProcessingStep;
use crate::mesh::{LevelOfDetail, MeshStore};

/// Keeps the meshes whose level of detail range includes the target
pub struct FilterLod {
    target: LevelOfDetail,
}

impl FilterLod {
    pub fn new(target: LevelOfDetail) -> Self {
        Self { target }
    }
}

impl MeshProcessingStep for FilterLod {
    fn name(&self) -> &'static str {
        "filter_lod"
    }

    fn apply(&self, store: &MeshStore) -> MeshStore {
        store
            .meshes()
            .iter()
            .filter(|m| m.mesh.is_visible_at(self.target))
            .cloned()
            .collect()
    }
}
