//! Empty terrain cells
//!
//! The data boundary is covered with a regular grid of synthetic areas so
//! that ground not covered by any mapped feature still gets a surface.
//! Grid corners become synthetic nodes shared by neighbouring cells.

use glam::DVec2;

use super::creation::add_area;
use super::elements::MapNode;
use super::{ElementId, ElementKind, MapData, NodeIdx, TagSet};

pub(super) fn add_empty_terrain(data: &mut MapData, cell_size: f64) {
    let Some(mut bounds) = data.boundary() else {
        return;
    };
    if bounds.size_x() <= 0.0 || bounds.size_z() <= 0.0 {
        bounds = bounds.pad(cell_size * 0.5);
    }

    let cells_x = (bounds.size_x() / cell_size).ceil().max(1.0) as usize;
    let cells_z = (bounds.size_z() / cell_size).ceil().max(1.0) as usize;
    let step_x = bounds.size_x() / cells_x as f64;
    let step_z = bounds.size_z() / cells_z as f64;

    let mut next_id = -1i64;
    let mut corners: Vec<NodeIdx> = Vec::with_capacity((cells_x + 1) * (cells_z + 1));
    for j in 0..=cells_z {
        for i in 0..=cells_x {
            let pos = DVec2::new(
                bounds.min_x + i as f64 * step_x,
                bounds.min_z + j as f64 * step_z,
            );
            corners.push(NodeIdx(data.nodes.len()));
            data.nodes.push(MapNode::new(
                ElementId::new(ElementKind::Node, next_id),
                pos,
                TagSet::new(),
            ));
            next_id -= 1;
        }
    }

    let corner = |i: usize, j: usize| corners[j * (cells_x + 1) + i];
    let mut cell_id = -1i64;
    for j in 0..cells_z {
        for i in 0..cells_x {
            let ring = vec![
                corner(i, j),
                corner(i + 1, j),
                corner(i + 1, j + 1),
                corner(i, j + 1),
                corner(i, j),
            ];
            let id = ElementId::new(ElementKind::Way, cell_id);
            cell_id -= 1;
            if let Err(e) = add_area(data, id, TagSet::new(), ring, Vec::new(), true) {
                log::debug!("[MapData] Skipped terrain cell {}: {}", id, e);
            }
        }
    }

    log::debug!(
        "[MapData] Added {} x {} empty terrain cells",
        cells_x,
        cells_z
    );
}
