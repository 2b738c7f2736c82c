//! Materials, colors and texture layers

use std::hash::{Hash, Hasher};
use std::ops::Mul;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::atlas::TextureAtlas;

/// Linear RGB color with components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }
}

impl Mul for Color {
    type Output = Color;

    fn mul(self, other: Color) -> Color {
        Color::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }
}

impl Eq for Color {}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.r.to_bits().hash(state);
        self.g.to_bits().hash(state);
        self.b.to_bits().hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Flat,
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transparency {
    Opaque,
    /// Fully transparent or fully opaque per pixel
    Binary,
    True,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureType {
    BaseColor,
    Normal,
    Orm,
    Displacement,
}

impl TextureType {
    pub const ALL: [TextureType; 4] = [
        TextureType::BaseColor,
        TextureType::Normal,
        TextureType::Orm,
        TextureType::Displacement,
    ];
}

/// Source of a texture
#[derive(Debug, Clone)]
pub enum TextureData {
    /// Image file covering `width` x `height` metres
    Image { path: String, width: f64, height: f64 },
    /// Placeholder for channels without content
    Blank,
    Atlas(Arc<TextureAtlas>),
}

impl TextureData {
    pub fn image(path: impl Into<String>, width: f64, height: f64) -> Self {
        TextureData::Image { path: path.into(), width, height }
    }

    /// Real-world size covered by one texture repetition
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            TextureData::Image { width, height, .. } => (*width, *height),
            TextureData::Blank | TextureData::Atlas(_) => (1.0, 1.0),
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            TextureData::Image { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl PartialEq for TextureData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                TextureData::Image { path: p1, width: w1, height: h1 },
                TextureData::Image { path: p2, width: w2, height: h2 },
            ) => p1 == p2 && w1.to_bits() == w2.to_bits() && h1.to_bits() == h2.to_bits(),
            (TextureData::Blank, TextureData::Blank) => true,
            (TextureData::Atlas(a), TextureData::Atlas(b)) => Arc::ptr_eq(a, b) || **a == **b,
            _ => false,
        }
    }
}

impl Eq for TextureData {}

impl Hash for TextureData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            TextureData::Image { path, width, height } => {
                path.hash(state);
                width.to_bits().hash(state);
                height.to_bits().hash(state);
            }
            TextureData::Blank => {}
            TextureData::Atlas(atlas) => atlas.hash(state),
        }
    }
}

/// One layer of textures applied on top of each other channel by channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureLayer {
    pub base_color: TextureData,
    pub normal: Option<TextureData>,
    pub orm: Option<TextureData>,
    pub displacement: Option<TextureData>,
    /// Whether the material color tints this layer
    pub colorable: bool,
}

impl TextureLayer {
    pub fn new(base_color: TextureData) -> Self {
        Self {
            base_color,
            normal: None,
            orm: None,
            displacement: None,
            colorable: true,
        }
    }

    pub fn get(&self, texture_type: TextureType) -> Option<&TextureData> {
        match texture_type {
            TextureType::BaseColor => Some(&self.base_color),
            TextureType::Normal => self.normal.as_ref(),
            TextureType::Orm => self.orm.as_ref(),
            TextureType::Displacement => self.displacement.as_ref(),
        }
    }

    /// Copy with one optional channel replaced. The base color is always kept.
    pub fn with(&self, texture_type: TextureType, texture: Option<TextureData>) -> Self {
        let mut layer = self.clone();
        match texture_type {
            TextureType::BaseColor => {
                if let Some(texture) = texture {
                    layer.base_color = texture;
                }
            }
            TextureType::Normal => layer.normal = texture,
            TextureType::Orm => layer.orm = texture,
            TextureType::Displacement => layer.displacement = texture,
        }
        layer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Material {
    pub interpolation: Interpolation,
    pub color: Color,
    pub transparency: Transparency,
    pub double_sided: bool,
    pub texture_layers: Vec<TextureLayer>,
}

impl Material {
    pub fn new(interpolation: Interpolation, color: Color) -> Self {
        Self {
            interpolation,
            color,
            transparency: Transparency::Opaque,
            double_sided: false,
            texture_layers: Vec::new(),
        }
    }

    pub fn with_color(&self, color: Color) -> Self {
        Self { color, ..self.clone() }
    }

    pub fn with_layers(&self, texture_layers: Vec<TextureLayer>) -> Self {
        Self { texture_layers, ..self.clone() }
    }

    pub fn with_transparency(&self, transparency: Transparency) -> Self {
        Self { transparency, ..self.clone() }
    }

    /// Equality with interpolation and/or color optionally ignored
    pub fn equals(&self, other: &Material, ignore_interpolation: bool, ignore_color: bool) -> bool {
        (ignore_interpolation || self.interpolation == other.interpolation)
            && (ignore_color || self.color == other.color)
            && self.transparency == other.transparency
            && self.double_sided == other.double_sided
            && self.texture_layers == other.texture_layers
    }
}

/// Named materials, built once and shared by reference
#[derive(Debug, Clone)]
pub struct Materials {
    by_name: IndexMap<&'static str, Material>,
    fallback: Material,
}

impl Materials {
    pub fn standard() -> Self {
        let textured = |color: Color, path: &str, size: f64| {
            Material::new(Interpolation::Smooth, color)
                .with_layers(vec![TextureLayer::new(TextureData::image(path, size, size))])
        };
        let plain = |interpolation, color| Material::new(interpolation, color);

        let mut by_name = IndexMap::new();
        by_name.insert("terrain", textured(Color::from_rgb8(0x66, 0x8c, 0x4a), "textures/terrain.png", 4.0));
        by_name.insert("grass", textured(Color::from_rgb8(0x55, 0x9a, 0x3c), "textures/grass.png", 2.0));
        by_name.insert("ground", plain(Interpolation::Smooth, Color::from_rgb8(0x8b, 0x6d, 0x4c)));
        by_name.insert("gravel", textured(Color::WHITE, "textures/gravel.png", 1.0));
        by_name.insert("pebblestone", textured(Color::WHITE, "textures/pebblestone.png", 1.0));
        by_name.insert("sand", textured(Color::from_rgb8(0xe8, 0xd6, 0x9e), "textures/sand.png", 2.0));
        by_name.insert("rock", plain(Interpolation::Flat, Color::from_rgb8(0x80, 0x80, 0x80)));
        by_name.insert("scree", plain(Interpolation::Flat, Color::from_rgb8(0x9a, 0x94, 0x8a)));
        by_name.insert("scrub", plain(Interpolation::Smooth, Color::from_rgb8(0x4f, 0x6b, 0x2f)));
        by_name.insert("snow", plain(Interpolation::Smooth, Color::new(0.95, 0.95, 1.0)));
        by_name.insert("asphalt", textured(Color::from_rgb8(0x50, 0x50, 0x50), "textures/asphalt.png", 3.0));
        by_name.insert("paving_stones", textured(Color::WHITE, "textures/paving_stones.png", 2.0));
        by_name.insert("water", plain(Interpolation::Smooth, Color::from_rgb8(0x3b, 0x6e, 0xa5)));
        by_name.insert(
            "building_wall",
            Material::new(Interpolation::Flat, Color::from_rgb8(0xe6, 0xd5, 0xbb)).with_layers(vec![
                TextureLayer::new(TextureData::image("textures/plaster.png", 2.5, 2.5)),
                TextureLayer {
                    colorable: false,
                    ..TextureLayer::new(TextureData::image("textures/dirt_overlay.png", 10.0, 3.0))
                },
            ]),
        );
        by_name.insert("roof", plain(Interpolation::Flat, Color::from_rgb8(0x9c, 0x4a, 0x3a)));
        by_name.insert("building_floor", plain(Interpolation::Flat, Color::from_rgb8(0xb0, 0xa8, 0x98)));
        by_name.insert("tree_trunk", plain(Interpolation::Smooth, Color::from_rgb8(0x5c, 0x40, 0x33)));
        by_name.insert("tree_crown", plain(Interpolation::Smooth, Color::from_rgb8(0x2f, 0x6b, 0x2a)));
        by_name.insert("bridge", plain(Interpolation::Flat, Color::from_rgb8(0xa0, 0xa0, 0xa0)));

        Self {
            fallback: plain(Interpolation::Smooth, Color::from_rgb8(0x8b, 0x6d, 0x4c)),
            by_name,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.by_name.get(name)
    }

    /// Material for a surface name, falling back to plain ground
    pub fn surface(&self, name: &str) -> &Material {
        self.by_name.get(name).unwrap_or(&self.fallback)
    }
}

impl Default for Materials {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equals_ignores_selected_fields() {
        let a = Material::new(Interpolation::Flat, Color::WHITE);
        let b = Material::new(Interpolation::Smooth, Color::new(0.5, 0.5, 0.5));
        assert!(!a.equals(&b, false, false));
        assert!(!a.equals(&b, true, false));
        assert!(!a.equals(&b, false, true));
        assert!(a.equals(&b, true, true));
    }

    #[test]
    fn test_layer_channel_replacement_keeps_base_color() {
        let layer = TextureLayer::new(TextureData::image("a.png", 1.0, 1.0))
            .with(TextureType::Normal, Some(TextureData::image("a_n.png", 1.0, 1.0)));
        assert!(layer.get(TextureType::Normal).is_some());
        let stripped = layer.with(TextureType::BaseColor, None).with(TextureType::Normal, None);
        assert_eq!(stripped.base_color, TextureData::image("a.png", 1.0, 1.0));
        assert!(stripped.normal.is_none());
    }

    #[test]
    fn test_color_multiplication() {
        let c = Color::new(0.5, 1.0, 0.25) * Color::new(0.5, 0.5, 1.0);
        assert_eq!(c, Color::new(0.25, 0.5, 0.25));
        assert_eq!(Color::WHITE * c, c);
    }

    #[test]
    fn test_surface_fallback() {
        let materials = Materials::standard();
        assert!(materials.get("grass").is_some());
        assert!(materials.get("unobtainium").is_none());
        assert_eq!(materials.surface("unobtainium").color, materials.surface("ground").color);
    }
}
