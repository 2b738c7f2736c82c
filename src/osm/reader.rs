use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use quick_xml::events::attributes::Attributes;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{OsmBounds, OsmData, OsmMember, OsmNode, OsmRelation, OsmWay};
use crate::map_data::{ElementKind, TagSet};

/// Parses an `.osm` XML file
///
/// # Example
/// ```ignore
/// let osm = parse_osm_file("tests/data/abutting_buildings.osm")?;
/// println!("{} nodes", osm.nodes.len());
/// ```
pub fn parse_osm_file<P: AsRef<Path>>(path: P) -> anyhow::Result<OsmData> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let start = Instant::now();
    let data = parse_osm(Reader::from_reader(BufReader::new(file)))
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    log::info!(
        "[OSM] {} nodes, {} ways, {} relations read from {} in {:?}",
        data.nodes.len(),
        data.ways.len(),
        data.relations.len(),
        path.display(),
        start.elapsed()
    );
    Ok(data)
}

pub fn parse_osm_str(xml: &str) -> anyhow::Result<OsmData> {
    parse_osm(Reader::from_str(xml))
}

/// Element whose children (`tag`, `nd`, `member`) are being collected
enum Open {
    Node(OsmNode),
    Way(OsmWay),
    Relation(OsmRelation),
}

impl Open {
    fn tags(&mut self) -> &mut TagSet {
        match self {
            Open::Node(n) => &mut n.tags,
            Open::Way(w) => &mut w.tags,
            Open::Relation(r) => &mut r.tags,
        }
    }
}

fn parse_osm<R: BufRead>(mut reader: Reader<R>) -> anyhow::Result<OsmData> {
    reader.trim_text(true);

    let mut data = OsmData::default();
    let mut open: Option<Open> = None;
    let mut seen_root = false;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let (start, self_closing) = match reader.read_event_into(&mut buf)? {
            Event::Start(start) => (start, false),
            Event::Empty(start) => (start, true),
            Event::End(end) => {
                if matches!(end.name().as_ref(), b"node" | b"way" | b"relation") {
                    if let Some(element) = open.take() {
                        finish(&mut data, element);
                    }
                }
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        let attributes = collect_attributes(start.attributes())?;
        match start.name().as_ref() {
            b"osm" => {
                seen_root = true;
                data.generator = attributes.get("generator").cloned();
            }
            b"bounds" => data.bounds = Some(parse_bounds(&attributes)?),
            b"node" => {
                let node = OsmNode {
                    id: required(&attributes, "id", &start)?,
                    lat: required(&attributes, "lat", &start)?,
                    lon: required(&attributes, "lon", &start)?,
                    tags: TagSet::new(),
                };
                open_element(&mut data, &mut open, Open::Node(node), self_closing);
            }
            b"way" => {
                let way = OsmWay {
                    id: required(&attributes, "id", &start)?,
                    node_refs: Vec::new(),
                    tags: TagSet::new(),
                };
                open_element(&mut data, &mut open, Open::Way(way), self_closing);
            }
            b"relation" => {
                let relation = OsmRelation {
                    id: required(&attributes, "id", &start)?,
                    members: Vec::new(),
                    tags: TagSet::new(),
                };
                open_element(&mut data, &mut open, Open::Relation(relation), self_closing);
            }
            b"tag" => {
                if let (Some(element), Some(k), Some(v)) = (open.as_mut(), attributes.get("k"), attributes.get("v")) {
                    element.tags().insert(k.as_str(), v.as_str());
                }
            }
            b"nd" => {
                if let Some(Open::Way(way)) = open.as_mut() {
                    way.node_refs.push(required(&attributes, "ref", &start)?);
                }
            }
            b"member" => {
                if let Some(Open::Relation(relation)) = open.as_mut() {
                    let kind = match attributes.get("type").map(String::as_str) {
                        Some("node") => ElementKind::Node,
                        Some("way") => ElementKind::Way,
                        Some("relation") => ElementKind::Relation,
                        other => anyhow::bail!("unknown member type {:?} in relation {}", other, relation.id),
                    };
                    relation.members.push(OsmMember {
                        kind,
                        ref_id: required(&attributes, "ref", &start)?,
                        role: attributes.get("role").cloned().unwrap_or_default(),
                    });
                }
            }
            _ => {}
        }
    }

    anyhow::ensure!(seen_root, "document has no <osm> root element");
    Ok(data)
}

fn open_element(data: &mut OsmData, open: &mut Option<Open>, element: Open, self_closing: bool) {
    if self_closing {
        finish(data, element);
    } else {
        *open = Some(element);
    }
}

fn finish(data: &mut OsmData, element: Open) {
    match element {
        Open::Node(n) => data.nodes.push(n),
        Open::Way(w) => data.ways.push(w),
        Open::Relation(r) => data.relations.push(r),
    }
}

fn parse_bounds(attributes: &HashMap<String, String>) -> anyhow::Result<OsmBounds> {
    let get = |key: &str| -> anyhow::Result<f64> {
        let value = attributes.get(key).with_context(|| format!("<bounds> is missing '{}'", key))?;
        value.parse().with_context(|| format!("invalid <bounds> {}='{}'", key, value))
    };
    Ok(OsmBounds {
        min_lat: get("minlat")?,
        min_lon: get("minlon")?,
        max_lat: get("maxlat")?,
        max_lon: get("maxlon")?,
    })
}

fn required<T>(attributes: &HashMap<String, String>, key: &str, element: &BytesStart<'_>) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let name = String::from_utf8_lossy(element.name().as_ref()).to_string();
    let value = attributes
        .get(key)
        .with_context(|| format!("<{}> is missing attribute '{}'", name, key))?;
    value
        .parse()
        .with_context(|| format!("<{}> has invalid {}='{}'", name, key, value))
}

fn collect_attributes(attributes: Attributes<'_>) -> anyhow::Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for attr in attributes {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.into_owned();
        map.insert(key, value);
    }
    Ok(map)
}
