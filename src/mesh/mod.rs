//! Output mesh model and mesh processing
//!
//! World objects draw into a `MeshTarget`, which produces a `MeshStore`.
//! The store is then run through a configurable list of processing steps.
//!
//! # Submodules
//! - `material` - Colors, texture layers and materials
//! - `atlas` - Texture atlases
//! - `geometry` - Triangle, extrusion and shape geometry
//! - `store` - Meshes, metadata and the mesh store
//! - `target` - Mesh collection while rendering world objects
//! - `processing` - Processing steps

mod material;
mod atlas;
mod geometry;
mod store;
mod target;
pub mod processing;

pub use material::{Color, Interpolation, Material, Materials, TextureData, TextureLayer, TextureType, Transparency};
pub use atlas::{TextureAtlas, TextureAtlasGroup};
pub use geometry::{
    global_xz_tex_coords, ExtrusionGeometry, Geometry, GeometryType, Shape, ShapeGeometry, TriangleGeometry,
};
pub use store::{LevelOfDetail, Mesh, MeshMetadata, MeshStore, MeshWithMetadata};
pub use target::MeshTarget;
pub use processing::{steps_from_config, MergeOption, MeshProcessingStep};
