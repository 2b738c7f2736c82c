//! Mesh processing steps
//!
//! Each step maps a `MeshStore` to a new one and never mutates its input.
//!
//! # Submodules
//! - `lod` - Level of detail filtering
//! - `layers` - Texture layer emulation with stacked copies
//! - `colors` - Baking material colors into vertex colors
//! - `atlas` - Replacing textures with a shared atlas
//! - `merge` - Merging compatible meshes
//! - `clip` - Clipping to a ground-plane boundary
//! - `textures` - Texture removal and forced triangulation

mod lod;
mod layers;
mod colors;
mod atlas;
mod merge;
mod clip;
mod textures;

pub use lod::FilterLod;
pub use layers::EmulateTextureLayers;
pub use colors::MoveColorsToVertices;
pub use atlas::ReplaceTexturesWithAtlas;
pub use merge::{MergeMeshes, MergeOption};
pub use clip::ClipToBounds;
pub use textures::{RemoveTextures, TriangulateGeometry};

use super::store::MeshStore;
use crate::config::{ConversionConfig, MeshStepConfig};
use crate::error::ConversionError;
use crate::math::SimplePolygon;

pub trait MeshProcessingStep: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, store: &MeshStore) -> MeshStore;
}

/// Builds the configured pipeline. `ClipToBounds` is skipped when no boundary is known.
pub fn steps_from_config(
    config: &ConversionConfig,
    boundary: Option<&SimplePolygon>,
) -> Result<Vec<Box<dyn MeshProcessingStep>>, ConversionError> {
    let mut steps: Vec<Box<dyn MeshProcessingStep>> = Vec::new();
    for step in &config.mesh_steps {
        match step {
            MeshStepConfig::FilterLod => steps.push(Box::new(FilterLod::new(config.target_lod))),
            MeshStepConfig::EmulateTextureLayers { max_layers } => {
                steps.push(Box::new(EmulateTextureLayers::new(*max_layers)))
            }
            MeshStepConfig::MoveColorsToVertices => steps.push(Box::new(MoveColorsToVertices)),
            MeshStepConfig::ReplaceTexturesWithAtlas { exclude } => {
                steps.push(Box::new(ReplaceTexturesWithAtlas::new(exclude.clone())))
            }
            MeshStepConfig::MergeMeshes { options } => {
                steps.push(Box::new(MergeMeshes::new(options.iter().copied())))
            }
            MeshStepConfig::ClipToBounds => match boundary {
                Some(boundary) => steps.push(Box::new(ClipToBounds::new(boundary.clone()))),
                None => log::warn!("[Mesh] No file boundary, skipping clip_to_bounds"),
            },
            MeshStepConfig::RemoveTextures { types } => {
                steps.push(Box::new(RemoveTextures::new(types.clone())?))
            }
        }
    }
    Ok(steps)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::TextureType;

    #[test]
    fn test_default_pipeline() {
        let steps = steps_from_config(&ConversionConfig::default(), None).unwrap();
        let names: Vec<_> = steps.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["filter_lod", "move_colors_to_vertices", "merge_meshes"]);
    }

    #[test]
    fn test_clip_skipped_without_boundary() {
        let config = ConversionConfig {
            mesh_steps: vec![
                MeshStepConfig::ClipToBounds,
                MeshStepConfig::MergeMeshes { options: vec![MergeOption::MergeElements] },
            ],
            ..ConversionConfig::default()
        };
        let steps = steps_from_config(&config, None).unwrap();
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_base_color_removal_is_rejected() {
        let config = ConversionConfig {
            mesh_steps: vec![MeshStepConfig::RemoveTextures { types: vec![TextureType::BaseColor] }],
            ..ConversionConfig::default()
        };
        assert!(steps_from_config(&config, None).is_err());
    }
}
