//! Scene export as JSON
//!
//! Meshes are grouped by their metadata. Vertex data is written as base64
//! encoded little-endian `f32` buffers, three vertices per triangle.
//! Only triangle geometry can be exported.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use base64::{engine::general_purpose, Engine as _};
use serde::{Serialize, Serializer};

use crate::mesh::{
    Geometry, Interpolation, LevelOfDetail, Material, Mesh, MeshStore, TextureData, TextureLayer, Transparency,
};

fn encode_f32(data: &[f32]) -> String {
    let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    general_purpose::STANDARD.encode(bytes)
}

/// Serialize Vec<f32> as base64-encoded string for compact JSON transmission
fn serialize_f32_vec_base64<S>(data: &Vec<f32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&encode_f32(data))
}

fn serialize_f32_vec_as_base64<S>(data: &Option<Vec<f32>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match data {
        Some(vec) => serializer.serialize_some(&encode_f32(vec)),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextureJson {
    Image { path: String, width: f64, height: f64 },
    Blank,
    Atlas { columns: usize, rows: usize, textures: Vec<TextureJson> },
}

impl From<&TextureData> for TextureJson {
    fn from(texture: &TextureData) -> Self {
        match texture {
            TextureData::Image { path, width, height } => TextureJson::Image {
                path: path.clone(),
                width: *width,
                height: *height,
            },
            TextureData::Blank => TextureJson::Blank,
            TextureData::Atlas(atlas) => TextureJson::Atlas {
                columns: atlas.columns(),
                rows: atlas.rows(),
                textures: atlas.textures.iter().map(TextureJson::from).collect(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TextureLayerJson {
    pub base_color: TextureJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal: Option<TextureJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orm: Option<TextureJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displacement: Option<TextureJson>,
    pub colorable: bool,
}

impl From<&TextureLayer> for TextureLayerJson {
    fn from(layer: &TextureLayer) -> Self {
        Self {
            base_color: (&layer.base_color).into(),
            normal: layer.normal.as_ref().map(TextureJson::from),
            orm: layer.orm.as_ref().map(TextureJson::from),
            displacement: layer.displacement.as_ref().map(TextureJson::from),
            colorable: layer.colorable,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MaterialJson {
    pub color: [f32; 3],
    pub interpolation: Interpolation,
    pub transparency: Transparency,
    pub double_sided: bool,
    pub layers: Vec<TextureLayerJson>,
}

impl From<&Material> for MaterialJson {
    fn from(material: &Material) -> Self {
        Self {
            color: [material.color.r, material.color.g, material.color.b],
            interpolation: material.interpolation,
            transparency: material.transparency,
            double_sided: material.double_sided,
            layers: material.texture_layers.iter().map(TextureLayerJson::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeshJson {
    pub material: MaterialJson,
    pub lod: [LevelOfDetail; 2],
    pub vertex_count: usize,
    /// x, y, z per vertex
    #[serde(serialize_with = "serialize_f32_vec_base64")]
    pub positions: Vec<f32>,
    /// x, y, z per vertex
    #[serde(serialize_with = "serialize_f32_vec_base64")]
    pub normals: Vec<f32>,
    /// r, g, b per vertex
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_f32_vec_as_base64")]
    pub colors: Option<Vec<f32>>,
    /// Base64 u, v per vertex, one buffer per texture layer
    pub tex_coords: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ObjectJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<&'static str>,
    pub meshes: Vec<MeshJson>,
}

#[derive(Debug, Serialize)]
pub struct SceneJson {
    pub objects: Vec<ObjectJson>,
}

fn mesh_json(mesh: &Mesh) -> anyhow::Result<MeshJson> {
    let geometry = match &mesh.geometry {
        Geometry::Triangles(geometry) => geometry,
        other => anyhow::bail!("cannot export {:?} geometry, triangulate it first", other.geometry_type()),
    };

    let positions = geometry
        .triangles
        .iter()
        .flat_map(|t| t.vertices())
        .flat_map(|v| [v.x as f32, v.y as f32, v.z as f32])
        .collect();
    let normals = geometry
        .normals
        .iter()
        .flat_map(|n| [n.x as f32, n.y as f32, n.z as f32])
        .collect();
    let colors = geometry
        .colors
        .as_ref()
        .map(|colors| colors.iter().flat_map(|c| [c.r, c.g, c.b]).collect());
    let tex_coords = geometry
        .tex_coords
        .iter()
        .map(|layer| {
            let uvs: Vec<f32> = layer.iter().flat_map(|uv| [uv.x as f32, uv.y as f32]).collect();
            encode_f32(&uvs)
        })
        .collect();

    Ok(MeshJson {
        material: (&mesh.material).into(),
        lod: [mesh.lod_min, mesh.lod_max],
        vertex_count: geometry.vertex_count(),
        positions,
        normals,
        colors,
        tex_coords,
    })
}

/// Serializable scene, one object per distinct mesh metadata in store order
pub fn export_scene(store: &MeshStore) -> anyhow::Result<SceneJson> {
    let objects = store
        .meshes_by_metadata()
        .into_iter()
        .map(|(metadata, meshes)| {
            let element = metadata.element.map(|id| id.to_string());
            let meshes = meshes
                .into_iter()
                .map(mesh_json)
                .collect::<anyhow::Result<Vec<_>>>()
                .with_context(|| format!("Failed to export {}", element.as_deref().unwrap_or("unnamed object")))?;
            Ok(ObjectJson {
                element,
                object_type: metadata.object_type,
                meshes,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(SceneJson { objects })
}

pub fn scene_to_json(store: &MeshStore) -> anyhow::Result<String> {
    let scene = export_scene(store)?;
    serde_json::to_string(&scene).context("Failed to serialize scene")
}

pub fn write_scene_json<P: AsRef<Path>>(store: &MeshStore, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    let scene = export_scene(store)?;
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &scene).with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;
    log::info!("[Export] {} objects written to {}", scene.objects.len(), path.display());
    Ok(())
}
