// Reading the .osm fixture through the public reader API
use osm_scene::map_data::ElementKind;
use osm_scene::osm::{parse_osm_file, parse_osm_str};

const FIXTURE: &str = "tests/data/abutting_buildings.osm";

#[test]
fn test_fixture_counts() {
    let osm = parse_osm_file(FIXTURE).expect("Failed to parse fixture");
    assert_eq!(osm.generator.as_deref(), Some("hand written fixture"));
    assert_eq!(osm.nodes.len(), 23);
    assert_eq!(osm.ways.len(), 7);
    assert_eq!(osm.relations.len(), 1);

    let bounds = osm.bounds.expect("bounds declared");
    assert_eq!(bounds.min_lat, 48.0);
    assert_eq!(bounds.max_lon, 11.003);
}

#[test]
fn test_fixture_tags_and_members() {
    let osm = parse_osm_file(FIXTURE).unwrap();

    let road = osm.ways.iter().find(|w| w.id == 200).unwrap();
    assert_eq!(road.node_refs, vec![10, 11]);
    assert_eq!(road.tags.get("name"), Some("Hauptstraße"));

    let tree = osm.nodes.iter().find(|n| n.id == 20).unwrap();
    assert_eq!(tree.tags.get("natural"), Some("tree"));

    let lake = &osm.relations[0];
    let roles: Vec<(ElementKind, i64, &str)> = lake
        .members
        .iter()
        .map(|m| (m.kind, m.ref_id, m.role.as_str()))
        .collect();
    assert_eq!(
        roles,
        vec![(ElementKind::Way, 401, "outer"), (ElementKind::Way, 402, "inner")]
    );
}

#[test]
fn test_missing_file_reports_path() {
    let err = parse_osm_file("tests/data/does_not_exist.osm").unwrap_err();
    assert!(err.to_string().contains("does_not_exist.osm"));
}

#[test]
fn test_malformed_xml_is_an_error() {
    assert!(parse_osm_str(r#"<osm><node id="1" lat="1" lon="2"></way></osm>"#).is_err());
}
