//! Texture atlases combining several textures into a grid of slots

use std::sync::Arc;

use indexmap::IndexMap;

use super::material::{TextureData, TextureLayer, TextureType};
use crate::math::DVec2;

/// Textures laid out in a square-ish grid, one slot per texture
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureAtlas {
    pub textures: Vec<TextureData>,
}

impl TextureAtlas {
    pub fn new(textures: Vec<TextureData>) -> Self {
        Self { textures }
    }

    pub fn columns(&self) -> usize {
        (self.textures.len() as f64).sqrt().ceil().max(1.0) as usize
    }

    pub fn rows(&self) -> usize {
        self.textures.len().div_ceil(self.columns()).max(1)
    }

    pub fn slot_of(&self, texture: &TextureData) -> Option<usize> {
        self.textures.iter().position(|t| t == texture)
    }

    /// Maps a coordinate in [0, 1] of the texture at `slot` into atlas space
    pub fn map_tex_coord(&self, slot: usize, uv: DVec2) -> DVec2 {
        let columns = self.columns();
        let rows = self.rows();
        let column = slot % columns;
        let row = slot / columns;
        DVec2::new(
            (column as f64 + uv.x) / columns as f64,
            (row as f64 + uv.y) / rows as f64,
        )
    }
}

/// One atlas per texture type, with matching slots across all types.
///
/// A layer is assigned the slot of its base color texture. Other channels of
/// that layer sit in the same slot of their own atlas, so a layer whose
/// channels disagree with an earlier layer sharing its base color cannot be
/// replaced.
#[derive(Debug, Clone)]
pub struct TextureAtlasGroup {
    slots: IndexMap<TextureData, TextureLayer>,
    atlases: IndexMap<TextureType, Arc<TextureAtlas>>,
}

impl TextureAtlasGroup {
    pub fn new<'a>(layers: impl IntoIterator<Item = &'a TextureLayer>) -> Self {
        let mut slots: IndexMap<TextureData, TextureLayer> = IndexMap::new();
        for layer in layers {
            slots.entry(layer.base_color.clone()).or_insert_with(|| layer.clone());
        }

        let mut atlases = IndexMap::new();
        for texture_type in TextureType::ALL {
            if !slots.values().any(|layer| layer.get(texture_type).is_some()) {
                continue;
            }
            let textures = slots
                .values()
                .map(|layer| layer.get(texture_type).cloned().unwrap_or(TextureData::Blank))
                .collect();
            atlases.insert(texture_type, Arc::new(TextureAtlas::new(textures)));
        }

        Self { slots, atlases }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn atlas(&self, texture_type: TextureType) -> Option<&Arc<TextureAtlas>> {
        self.atlases.get(&texture_type)
    }

    /// Slot for a layer if every channel of it matches the slot's contents
    pub fn slot_for(&self, layer: &TextureLayer) -> Option<usize> {
        let (slot, _, stored) = self.slots.get_full(&layer.base_color)?;
        TextureType::ALL
            .iter()
            .all(|&t| stored.get(t) == layer.get(t))
            .then_some(slot)
    }

    /// Layer referencing the atlases in place of the textures at `slot`
    pub fn replacement_layer(&self, slot: usize) -> Option<TextureLayer> {
        let (_, stored) = self.slots.get_index(slot)?;
        let channel = |texture_type: TextureType| {
            stored.get(texture_type)?;
            self.atlases.get(&texture_type).map(|atlas| TextureData::Atlas(atlas.clone()))
        };
        Some(TextureLayer {
            base_color: channel(TextureType::BaseColor)?,
            normal: channel(TextureType::Normal),
            orm: channel(TextureType::Orm),
            displacement: channel(TextureType::Displacement),
            colorable: stored.colorable,
        })
    }

    pub fn map_tex_coord(&self, slot: usize, uv: DVec2) -> DVec2 {
        match self.atlases.get(&TextureType::BaseColor) {
            Some(atlas) => atlas.map_tex_coord(slot, uv),
            None => uv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> TextureData {
        TextureData::image(name, 1.0, 1.0)
    }

    #[test]
    fn test_grid_layout() {
        let atlas = TextureAtlas::new((0..5).map(|i| image(&format!("{i}.png"))).collect());
        assert_eq!(atlas.columns(), 3);
        assert_eq!(atlas.rows(), 2);
        let mapped = atlas.map_tex_coord(4, DVec2::new(0.5, 0.5));
        assert!((mapped.x - 1.5 / 3.0).abs() < 1e-12);
        assert!((mapped.y - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_slots_align_across_channels() {
        let a = TextureLayer::new(image("a.png")).with(TextureType::Normal, Some(image("a_n.png")));
        let b = TextureLayer::new(image("b.png"));
        let group = TextureAtlasGroup::new([&a, &b]);
        assert_eq!(group.len(), 2);

        let normals = group.atlas(TextureType::Normal).unwrap();
        assert_eq!(normals.textures, vec![image("a_n.png"), TextureData::Blank]);
        assert!(group.atlas(TextureType::Orm).is_none());

        assert_eq!(group.slot_for(&a), Some(0));
        assert_eq!(group.slot_for(&b), Some(1));
        let replacement = group.replacement_layer(0).unwrap();
        assert!(matches!(replacement.base_color, TextureData::Atlas(_)));
        assert!(replacement.normal.is_some());
        assert!(group.replacement_layer(1).unwrap().normal.is_none());
    }

    #[test]
    fn test_conflicting_channels_are_not_replaceable() {
        let a = TextureLayer::new(image("a.png"));
        let a_with_normal = a.with(TextureType::Normal, Some(image("n.png")));
        let group = TextureAtlasGroup::new([&a, &a_with_normal]);
        assert_eq!(group.len(), 1);
        assert_eq!(group.slot_for(&a), Some(0));
        assert_eq!(group.slot_for(&a_with_normal), None);
    }
}
