//! Uniform grid index
//!
//! Build once, query many: every insertion returns the previously inserted
//! items that share at least one cell with the new item's bounding box.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::math::AxisAlignedRectangle;

#[derive(Debug, Clone)]
pub struct IndexGrid<T> {
    bounds: AxisAlignedRectangle,
    cells_x: usize,
    cells_z: usize,
    cell_size_x: f64,
    cell_size_z: f64,
    /// Sparse cells holding (insertion sequence, item)
    cells: HashMap<(usize, usize), Vec<(usize, T)>>,
    inserted: usize,
}

impl<T: Copy + Eq + Hash> IndexGrid<T> {
    /// Grid with `divisor` cells per axis over `bounds`.
    /// An axis without positive finite extent collapses to a single cell.
    pub fn new(bounds: AxisAlignedRectangle, divisor: usize) -> Self {
        let divisor = divisor.max(1);
        let (cells_x, cell_size_x) = axis_cells(bounds.size_x(), divisor);
        let (cells_z, cell_size_z) = axis_cells(bounds.size_z(), divisor);
        Self {
            bounds,
            cells_x,
            cells_z,
            cell_size_x,
            cell_size_z,
            cells: HashMap::new(),
            inserted: 0,
        }
    }

    pub fn cell_counts(&self) -> (usize, usize) {
        (self.cells_x, self.cells_z)
    }

    pub fn len(&self) -> usize {
        self.inserted
    }

    pub fn is_empty(&self) -> bool {
        self.inserted == 0
    }

    /// Insert `item` and return all earlier items in shared cells,
    /// each once, in insertion order. Boxes outside the bounds are clamped
    /// into the border cells.
    pub fn insert_and_probe(&mut self, item: T, bbox: &AxisAlignedRectangle) -> Vec<T> {
        let x0 = cell_index(bbox.min_x, self.bounds.min_x, self.cell_size_x, self.cells_x);
        let x1 = cell_index(bbox.max_x, self.bounds.min_x, self.cell_size_x, self.cells_x);
        let z0 = cell_index(bbox.min_z, self.bounds.min_z, self.cell_size_z, self.cells_z);
        let z1 = cell_index(bbox.max_z, self.bounds.min_z, self.cell_size_z, self.cells_z);

        let sequence = self.inserted;
        self.inserted += 1;

        let mut seen: HashSet<T> = HashSet::new();
        let mut found: Vec<(usize, T)> = Vec::new();

        for cx in x0.min(x1)..=x0.max(x1) {
            for cz in z0.min(z1)..=z0.max(z1) {
                let cell = self.cells.entry((cx, cz)).or_default();
                for &(seq, other) in cell.iter() {
                    if seen.insert(other) {
                        found.push((seq, other));
                    }
                }
                cell.push((sequence, item));
            }
        }

        found.sort_by_key(|(seq, _)| *seq);
        found.into_iter().map(|(_, item)| item).collect()
    }
}

fn axis_cells(size: f64, divisor: usize) -> (usize, f64) {
    if size.is_finite() && size > 0.0 {
        (divisor, size / divisor as f64)
    } else {
        (1, 1.0)
    }
}

fn cell_index(value: f64, min: f64, cell_size: f64, cells: usize) -> usize {
    if cells == 1 {
        return 0;
    }
    let index = ((value - min) / cell_size).floor();
    if index.is_nan() || index < 0.0 {
        0
    } else {
        (index as usize).min(cells - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x1: f64, z1: f64, x2: f64, z2: f64) -> AxisAlignedRectangle {
        AxisAlignedRectangle::new(x1, z1, x2, z2)
    }

    #[test]
    fn test_probe_returns_earlier_neighbours_only() {
        let mut grid = IndexGrid::new(rect(0.0, 0.0, 100.0, 100.0), 10);
        assert!(grid.insert_and_probe(1, &rect(1.0, 1.0, 2.0, 2.0)).is_empty());
        assert!(grid.insert_and_probe(2, &rect(80.0, 80.0, 85.0, 85.0)).is_empty());
        let near = grid.insert_and_probe(3, &rect(0.0, 0.0, 15.0, 15.0));
        assert_eq!(near, vec![1]);
        let wide = grid.insert_and_probe(4, &rect(0.0, 0.0, 100.0, 100.0));
        assert_eq!(wide, vec![1, 2, 3]);
        assert_eq!(grid.len(), 4);
    }

    #[test]
    fn test_items_spanning_cells_are_reported_once() {
        let mut grid = IndexGrid::new(rect(0.0, 0.0, 10.0, 10.0), 10);
        grid.insert_and_probe('a', &rect(0.0, 0.0, 9.0, 9.0));
        let found = grid.insert_and_probe('b', &rect(0.0, 0.0, 9.0, 9.0));
        assert_eq!(found, vec!['a']);
    }

    #[test]
    fn test_zero_area_bounds_fall_back_to_one_cell() {
        let mut grid = IndexGrid::new(rect(5.0, 5.0, 5.0, 5.0), 1000);
        assert_eq!(grid.cell_counts(), (1, 1));
        grid.insert_and_probe(1, &rect(5.0, 5.0, 5.0, 5.0));
        assert_eq!(grid.insert_and_probe(2, &rect(5.0, 5.0, 5.0, 5.0)), vec![1]);

        let line = IndexGrid::<u8>::new(rect(0.0, 3.0, 10.0, 3.0), 1000);
        assert_eq!(line.cell_counts(), (1000, 1));

        let zero_divisor = IndexGrid::<u8>::new(rect(0.0, 0.0, 10.0, 10.0), 0);
        assert_eq!(zero_divisor.cell_counts(), (1, 1));
    }

    #[test]
    fn test_out_of_bounds_items_are_clamped() {
        let mut grid = IndexGrid::new(rect(0.0, 0.0, 10.0, 10.0), 10);
        grid.insert_and_probe(1, &rect(-50.0, -50.0, -40.0, -40.0));
        assert_eq!(grid.insert_and_probe(2, &rect(0.0, 0.0, 0.5, 0.5)), vec![1]);
    }
}
