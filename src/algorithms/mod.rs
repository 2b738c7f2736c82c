//! Geometric algorithms on ground-plane polygons
//!
//! # Submodules
//! - `cag` - Constructive area geometry (subtract, intersect) backed by `geo`
//! - `triangulation` - Ear-clipping triangulation with holes and interior points

mod cag;
mod triangulation;

pub use cag::{intersect_polygons, subtract_polygons};
pub use triangulation::{triangulate, triangulate_polygon};
