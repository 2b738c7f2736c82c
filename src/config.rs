//! Conversion configuration and feature rule tables
//!
//! `ConversionConfig` is deserialized from JSON with every field optional.
//! `FeatureRules` is an immutable table built once per run and passed by
//! reference to the code that decides what an element becomes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConversionError;
use crate::map_data::TagSet;
use crate::mesh::{LevelOfDetail, MergeOption, TextureType};

/// Surface name used for synthetic terrain cells
pub const EMPTY_TERRAIN_SURFACE: &str = "terrain";

/// One entry of the mesh processing pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum MeshStepConfig {
    /// Keep meshes visible at `ConversionConfig::target_lod`
    FilterLod,
    EmulateTextureLayers {
        #[serde(default = "default_max_texture_layers")]
        max_layers: usize,
    },
    MoveColorsToVertices,
    ReplaceTexturesWithAtlas {
        /// Base color texture paths that must keep their own texture
        #[serde(default)]
        exclude: Vec<String>,
    },
    MergeMeshes {
        #[serde(default)]
        options: Vec<MergeOption>,
    },
    /// Clip to the file boundary of the input
    ClipToBounds,
    RemoveTextures {
        types: Vec<TextureType>,
    },
}

fn default_max_texture_layers() -> usize {
    4
}

/// Settings for one conversion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub target_lod: LevelOfDetail,
    /// Fill the data bounds with empty terrain cells
    pub create_terrain: bool,
    pub terrain_cell_size: f64,
    /// Spacing of the extra triangulation points inside terrain surfaces, 0 disables them
    pub terrain_point_grid_distance: f64,
    /// Number of overlap grid cells per axis
    pub overlap_grid_divisor: usize,
    /// Largest accepted width/height of the input in metres
    pub max_bounds_size: f64,
    /// Reject oversized inputs instead of converting them anyway
    pub fail_on_large_bbox: bool,
    /// Minimum clearance below bridges
    pub bridge_clearance: f64,
    /// Minimum depth of tunnels below the ground
    pub tunnel_clearance: f64,
    /// Distance between a surface and an element passing above it
    pub surface_clearance_above: f64,
    /// Distance between a surface and an element passing below it
    pub surface_clearance_below: f64,
    pub mesh_steps: Vec<MeshStepConfig>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            target_lod: LevelOfDetail::Lod4,
            create_terrain: true,
            terrain_cell_size: 100.0,
            terrain_point_grid_distance: 30.0,
            overlap_grid_divisor: 1000,
            max_bounds_size: 10_000.0,
            fail_on_large_bbox: true,
            bridge_clearance: 4.5,
            tunnel_clearance: 10.0,
            surface_clearance_above: 1.0,
            surface_clearance_below: 10.0,
            mesh_steps: vec![
                MeshStepConfig::FilterLod,
                MeshStepConfig::MoveColorsToVertices,
                MeshStepConfig::MergeMeshes { options: Vec::new() },
            ],
        }
    }
}

impl ConversionConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConversionError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ConversionError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConversionError> {
        let invalid = |msg: &str| Err(ConversionError::InvalidConfig(msg.to_string()));

        if !(self.terrain_cell_size.is_finite() && self.terrain_cell_size > 0.0) {
            return invalid("terrain_cell_size must be positive");
        }
        if !(self.terrain_point_grid_distance.is_finite() && self.terrain_point_grid_distance >= 0.0) {
            return invalid("terrain_point_grid_distance must not be negative");
        }
        if self.overlap_grid_divisor == 0 {
            return invalid("overlap_grid_divisor must be at least 1");
        }
        if !(self.max_bounds_size > 0.0) {
            return invalid("max_bounds_size must be positive");
        }
        let clearances = [
            self.bridge_clearance,
            self.tunnel_clearance,
            self.surface_clearance_above,
            self.surface_clearance_below,
        ];
        if clearances.iter().any(|c| !(c.is_finite() && *c >= 0.0)) {
            return invalid("clearances must be finite and not negative");
        }
        for step in &self.mesh_steps {
            match step {
                MeshStepConfig::RemoveTextures { types } if types.contains(&TextureType::BaseColor) => {
                    return invalid("base color textures cannot be removed");
                }
                MeshStepConfig::EmulateTextureLayers { max_layers: 0 } => {
                    return invalid("max_layers must be at least 1");
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Tag rules that decide which closed ways are areas and which surface
/// an otherwise unspecified area gets
#[derive(Debug, Clone)]
pub struct FeatureRules {
    area_keys: HashSet<&'static str>,
    area_tags: Vec<(&'static str, &'static str)>,
    default_surfaces: Vec<((&'static str, &'static str), &'static str)>,
}

impl FeatureRules {
    pub fn standard() -> Self {
        Self {
            area_keys: [
                "building",
                "building:part",
                "landuse",
                "landcover",
                "leisure",
                "amenity",
                "place",
                "man_made",
            ]
            .into_iter()
            .collect(),
            area_tags: vec![
                ("natural", "water"),
                ("natural", "wood"),
                ("natural", "bare_rock"),
                ("natural", "beach"),
                ("natural", "fell"),
                ("natural", "glacier"),
                ("natural", "grassland"),
                ("natural", "mud"),
                ("natural", "sand"),
                ("natural", "scree"),
                ("natural", "scrub"),
                ("natural", "shingle"),
                ("highway", "pedestrian"),
            ],
            default_surfaces: vec![
                (("highway", "pedestrian"), "paving_stones"),
                (("landcover", "grass"), "grass"),
                (("landcover", "gravel"), "gravel"),
                (("landcover", "ground"), "ground"),
                (("landuse", "construction"), "ground"),
                (("landuse", "grass"), "grass"),
                (("landuse", "meadow"), "grass"),
                (("leisure", "pitch"), "ground"),
                (("natural", "bare_rock"), "rock"),
                (("natural", "beach"), "sand"),
                (("natural", "fell"), "grass"),
                (("natural", "glacier"), "snow"),
                (("natural", "grassland"), "grass"),
                (("natural", "mud"), "ground"),
                (("natural", "sand"), "sand"),
                (("natural", "shingle"), "pebblestone"),
                (("natural", "water"), "water"),
                (("natural", "scree"), "scree"),
                (("natural", "scrub"), "scrub"),
            ],
        }
    }

    /// Whether a closed way with these tags describes an area
    pub fn is_area(&self, tags: &TagSet) -> bool {
        match tags.get("area") {
            Some("no") => false,
            Some("yes") => true,
            _ => tags
                .iter()
                .any(|(k, v)| {
                    self.area_keys.contains(k)
                        || self.area_tags.iter().any(|&(ak, av)| ak == k && av == v)
                }),
        }
    }

    /// Explicit `surface` tag, otherwise the default surface for the tags
    pub fn surface<'a>(&'a self, tags: &'a TagSet) -> Option<&'a str> {
        tags.get("surface").or_else(|| {
            self.default_surfaces
                .iter()
                .find(|((k, v), _)| tags.contains(k, v))
                .map(|(_, surface)| *surface)
        })
    }
}

impl Default for FeatureRules {
    fn default() -> Self {
        Self::standard()
    }
}
