//! Overlap detection between map elements
//!
//! Candidate pairs come from a uniform grid, classification runs in parallel
//! with Rayon, and results are attached to both participants in candidate
//! order so the outcome does not depend on thread scheduling.
//!
//! # Submodules
//! - `grid` - Uniform insert-and-probe spatial index
//! - `types` - Overlap records
//! - `checks` - Pairwise classification by element kind
//! - `runner` - Entry point over a whole `MapData`

mod grid;
mod types;
mod checks;
mod runner;

pub use grid::IndexGrid;
pub use types::{Overlap, OverlapKind};
pub use checks::classify;
pub use runner::detect_overlaps;
