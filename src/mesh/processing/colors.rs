use super::MeshProcessingStep;
use crate::mesh::{Color, Geometry, Mesh, MeshStore, MeshWithMetadata};

/// Multiplies the material color into the vertex colors and resets the
/// material color to white. Meshes whose textures all ignore the material
/// color are left alone.
pub struct MoveColorsToVertices;

fn bake(mesh: &Mesh) -> Option<Mesh> {
    let material = &mesh.material;
    let colorable = material.texture_layers.is_empty()
        || material.texture_layers.iter().any(|layer| layer.colorable);
    if !colorable || material.color == Color::WHITE {
        return None;
    }

    let color = material.color;
    let geometry = match &mesh.geometry {
        Geometry::Triangles(triangles) => {
            let mut triangles = triangles.clone();
            let baked = triangles.colors_or_white().into_iter().map(|c| c * color).collect();
            triangles.colors = Some(baked);
            Geometry::Triangles(triangles)
        }
        Geometry::Extrusion(extrusion) => {
            let mut extrusion = extrusion.clone();
            extrusion.color = Some(extrusion.color.unwrap_or(Color::WHITE) * color);
            Geometry::Extrusion(extrusion)
        }
        Geometry::Shape(shape) => {
            let mut shape = shape.clone();
            shape.color = Some(shape.color.unwrap_or(Color::WHITE) * color);
            Geometry::Shape(shape)
        }
    };
    Some(Mesh {
        geometry,
        material: material.with_color(Color::WHITE),
        ..mesh.clone()
    })
}

impl MeshProcessingStep for MoveColorsToVertices {
    fn name(&self) -> &'static str {
        "move_colors_to_vertices"
    }

    fn apply(&self, store: &MeshStore) -> MeshStore {
        store
            .meshes()
            .iter()
            .map(|entry| match bake(&entry.mesh) {
                Some(mesh) => MeshWithMetadata { mesh, metadata: entry.metadata.clone() },
                None => entry.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DVec3;
    use crate::mesh::processing::test_util::{entry, plain, triangle_mesh};
    use crate::mesh::{ExtrusionGeometry, TextureData, TextureLayer};

    #[test]
    fn test_color_moves_to_vertices() {
        let red = Color::new(1.0, 0.0, 0.0);
        let store: MeshStore = vec![entry(triangle_mesh(0.0, plain(red)), 1)].into();
        let result = MoveColorsToVertices.apply(&store);

        let mesh = &result.meshes()[0].mesh;
        assert_eq!(mesh.material.color, Color::WHITE);
        match &mesh.geometry {
            Geometry::Triangles(g) => assert_eq!(g.colors.as_deref(), Some(&[red, red, red][..])),
            _ => panic!("expected triangles"),
        }
    }

    #[test]
    fn test_uncolorable_textures_are_skipped() {
        let layer = TextureLayer {
            colorable: false,
            ..TextureLayer::new(TextureData::image("brick.png", 1.0, 1.0))
        };
        let material = plain(Color::new(0.0, 1.0, 0.0)).with_layers(vec![layer]);
        let store: MeshStore = vec![entry(triangle_mesh(0.0, material.clone()), 1)].into();
        let result = MoveColorsToVertices.apply(&store);
        assert_eq!(result.meshes()[0].mesh.material, material);
    }

    #[test]
    fn test_extrusion_color_is_multiplied() {
        let mut trunk = ExtrusionGeometry::vertical_circle(DVec3::ZERO, 0.3, 2.0, 1.0, 6);
        trunk.color = Some(Color::new(0.5, 0.5, 0.5));
        let mesh = Mesh::new(Geometry::Extrusion(trunk), plain(Color::new(0.5, 1.0, 1.0)));
        let result = MoveColorsToVertices.apply(&vec![entry(mesh, 1)].into());
        match &result.meshes()[0].mesh.geometry {
            Geometry::Extrusion(e) => assert_eq!(e.color, Some(Color::new(0.25, 0.5, 0.5))),
            _ => panic!("expected extrusion"),
        }
    }
}
