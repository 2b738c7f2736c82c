// Mesh processing pipeline built from configuration
use std::sync::Arc;

use osm_scene::config::ConversionConfig;
use osm_scene::export::scene_to_json;
use osm_scene::map_data::{ElementId, ElementKind};
use osm_scene::math::{DVec2, DVec3, SimplePolygon, TriangleXYZ};
use osm_scene::mesh::processing::ReplaceTexturesWithAtlas;
use osm_scene::mesh::{
    steps_from_config, Color, ExtrusionGeometry, Geometry, LevelOfDetail, Material, Materials, Mesh, MeshMetadata,
    MeshProcessingStep, MeshStore, TextureData, TriangleGeometry,
};

fn triangle(x: f64) -> TriangleXYZ {
    TriangleXYZ::new(
        DVec3::new(x, 0.0, 0.0),
        DVec3::new(x + 1.0, 0.0, 0.0),
        DVec3::new(x, 0.0, 1.0),
    )
}

fn textured_mesh(xs: &[f64], material: &Material, uv_scale: f64) -> Mesh {
    let triangles: Vec<TriangleXYZ> = xs.iter().map(|&x| triangle(x)).collect();
    let uvs: Vec<DVec2> = triangles
        .iter()
        .flat_map(|_| [DVec2::ZERO, DVec2::new(uv_scale, 0.0), DVec2::new(0.0, uv_scale)])
        .collect();
    let geometry = TriangleGeometry::new(triangles, material.interpolation)
        .with_tex_coords(vec![uvs; material.texture_layers.len()]);
    Mesh::new(Geometry::Triangles(geometry), material.clone())
}

fn metadata(way: i64, object_type: &'static str) -> MeshMetadata {
    MeshMetadata::new(ElementId::new(ElementKind::Way, way), object_type)
}

fn sample_store(materials: &Materials) -> MeshStore {
    let mut store = MeshStore::new();
    let wall = materials.get("building_wall").unwrap();
    let grass = materials.get("grass").unwrap();
    store.add(textured_mesh(&[1.0, 20.0], wall, 1.0), metadata(1, "Building"));
    store.add(textured_mesh(&[3.0], grass, 1.0), metadata(2, "SurfaceArea"));

    let trunk = ExtrusionGeometry::vertical_circle(DVec3::new(5.0, 0.0, 5.0), 0.3, 3.0, 1.0, 6);
    let far_only = Mesh::new(Geometry::Extrusion(trunk), materials.surface("tree_trunk").clone())
        .with_lod_range(LevelOfDetail::Lod0, LevelOfDetail::Lod1);
    store.add(far_only, metadata(3, "Tree"));
    store
}

fn boundary() -> SimplePolygon {
    SimplePolygon::new(vec![
        DVec2::new(0.0, 0.0),
        DVec2::new(10.0, 0.0),
        DVec2::new(10.0, 10.0),
        DVec2::new(0.0, 10.0),
    ])
    .unwrap()
}

fn configured_steps() -> Vec<Box<dyn MeshProcessingStep>> {
    let config = ConversionConfig::from_json(
        r#"{ "mesh_steps": [
            { "step": "filter_lod" },
            { "step": "emulate_texture_layers", "max_layers": 1 },
            { "step": "move_colors_to_vertices" },
            { "step": "replace_textures_with_atlas" },
            { "step": "merge_meshes", "options": ["merge_elements"] },
            { "step": "clip_to_bounds" }
        ] }"#,
    )
    .expect("valid config");
    steps_from_config(&config, Some(&boundary())).expect("valid steps")
}

#[test]
fn test_configured_pipeline() {
    let materials = Materials::standard();
    let steps = configured_steps();
    let names: Vec<&str> = steps.iter().map(|s| s.name()).collect();
    assert_eq!(names.len(), 6);

    let result = sample_store(&materials).process(&steps);
    assert_eq!(result.len(), 1, "wall and grass merge into one mesh");

    let merged = &result.meshes()[0];
    assert_eq!(merged.metadata, MeshMetadata::default());
    assert_eq!(merged.mesh.material.color, Color::WHITE);
    assert_eq!(merged.mesh.material.texture_layers.len(), 1);
    match &merged.mesh.material.texture_layers[0].base_color {
        TextureData::Atlas(atlas) => assert_eq!(atlas.textures.len(), 2),
        other => panic!("expected an atlas, got {:?}", other),
    }

    let Geometry::Triangles(geometry) = &merged.mesh.geometry else {
        panic!("merged geometry is not triangles");
    };
    // the wall triangle at x = 20 lies outside the boundary
    assert_eq!(geometry.len(), 2);
    let colors = geometry.colors.as_ref().expect("vertex colors");
    assert_eq!(colors.len(), 6);
    assert!(colors.iter().all(|c| *c != Color::WHITE));
    assert!(geometry.tex_coords[0]
        .iter()
        .all(|uv| (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y)));
}

#[test]
fn test_tiling_textures_stay_images() {
    let materials = Materials::standard();
    let grass = materials.get("grass").unwrap();
    let mut store = MeshStore::new();
    store.add(textured_mesh(&[0.0], grass, 3.0), metadata(1, "SurfaceArea"));

    let result = ReplaceTexturesWithAtlas::new(Vec::new()).apply(&store);
    let layer = &result.meshes()[0].mesh.material.texture_layers[0];
    assert_eq!(layer.base_color.path(), Some("textures/grass.png"));
}

#[test]
fn test_atlas_group_is_reused_across_stores() {
    let materials = Materials::standard();
    let grass = materials.get("grass").unwrap();
    let sand = materials.get("sand").unwrap();

    let mut first = MeshStore::new();
    first.add(textured_mesh(&[0.0], grass, 1.0), metadata(1, "SurfaceArea"));
    first.add(textured_mesh(&[2.0], sand, 1.0), metadata(2, "SurfaceArea"));
    let group = Arc::new(ReplaceTexturesWithAtlas::new(Vec::new()).build_group(&first));
    assert_eq!(group.len(), 2);

    let mut second = MeshStore::new();
    second.add(textured_mesh(&[5.0], sand, 1.0), metadata(3, "SurfaceArea"));

    let step = ReplaceTexturesWithAtlas::with_group(Vec::new(), group);
    let a = step.apply(&first);
    let b = step.apply(&second);
    let base = |store: &MeshStore, i: usize| store.meshes()[i].mesh.material.texture_layers[0].base_color.clone();
    assert!(matches!(base(&b, 0), TextureData::Atlas(_)));
    assert_eq!(base(&a, 1), base(&b, 0));
}

#[test]
fn test_pipeline_is_deterministic() {
    let materials = Materials::standard();
    let steps = configured_steps();
    let first = scene_to_json(&sample_store(&materials).process(&steps)).unwrap();
    let second = scene_to_json(&sample_store(&materials).process(&steps)).unwrap();
    assert_eq!(first, second);
}
