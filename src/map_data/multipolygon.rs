//! Ring assembly for multipolygon relations
//!
//! Member ways are joined end to end into closed rings. Roles are not
//! trusted: rings nested at an even depth become outer rings, rings at an
//! odd depth become holes of the smallest enclosing outer ring.

use glam::DVec2;

use super::NodeIdx;
use crate::error::GeometryError;
use crate::math::SimplePolygon;

/// Outer ring and hole rings of one area, as closed node lists
pub(super) type RingSet = (Vec<NodeIdx>, Vec<Vec<NodeIdx>>);

/// Join way node lists into closed rings
pub(super) fn assemble_rings(member_ways: &[Vec<NodeIdx>]) -> Result<Vec<Vec<NodeIdx>>, GeometryError> {
    let mut remaining: Vec<Vec<NodeIdx>> = member_ways
        .iter()
        .filter(|w| w.len() >= 2)
        .cloned()
        .collect();
    let mut rings = Vec::new();

    while !remaining.is_empty() {
        let mut current = remaining.remove(0);
        while current.first() != current.last() {
            let end = current[current.len() - 1];
            let next = remaining
                .iter()
                .position(|w| w[0] == end || w[w.len() - 1] == end)
                .ok_or(GeometryError::UnclosedRing)?;
            let mut next = remaining.remove(next);
            if next[0] != end {
                next.reverse();
            }
            current.extend(next.into_iter().skip(1));
        }
        if current.len() < 4 {
            return Err(GeometryError::TooFewVertices(current.len().saturating_sub(1)));
        }
        rings.push(current);
    }

    Ok(rings)
}

/// Group closed rings into areas by containment depth
pub(super) fn nest_rings(
    rings: Vec<Vec<NodeIdx>>,
    pos: impl Fn(NodeIdx) -> DVec2,
) -> Result<Vec<RingSet>, GeometryError> {
    let polygons = rings
        .iter()
        .map(|ring| SimplePolygon::new(ring.iter().map(|&n| pos(n)).collect()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut order: Vec<usize> = (0..rings.len()).collect();
    order.sort_by(|&a, &b| polygons[b].area().total_cmp(&polygons[a].area()));

    let encloses = |outer: usize, inner: usize| {
        outer != inner
            && polygons[outer].area() > polygons[inner].area()
            && polygons[outer].contains_polygon(&polygons[inner])
    };

    let depth: Vec<usize> = (0..rings.len())
        .map(|i| (0..rings.len()).filter(|&j| encloses(j, i)).count())
        .collect();

    let outers: Vec<usize> = order.iter().copied().filter(|&i| depth[i] % 2 == 0).collect();
    let mut holes_of: Vec<Vec<usize>> = vec![Vec::new(); rings.len()];

    for &i in order.iter().filter(|&&i| depth[i] % 2 == 1) {
        // the smallest enclosing outer ring is the last one in area-descending order
        let parent = outers
            .iter()
            .rev()
            .copied()
            .find(|&o| depth[o] + 1 == depth[i] && encloses(o, i));
        if let Some(parent) = parent {
            holes_of[parent].push(i);
        }
    }

    Ok(outers
        .into_iter()
        .map(|o| {
            let holes = holes_of[o].iter().map(|&h| rings[h].clone()).collect();
            (rings[o].clone(), holes)
        })
        .collect())
}
