//! Geometry kernel for the XZ ground plane and 3D scene space
//!
//! 2D positions are `glam::DVec2` values where `x` points east and `y` holds
//! the Z (north) coordinate. 3D positions are `DVec3` with `y` up.
//!
//! # Submodules
//! - `bbox` - Axis-aligned rectangles
//! - `segment` - Line segments and segment intersection
//! - `polygon` - Simple polygons and polygons with holes
//! - `triangle` - 2D and 3D triangles

mod bbox;
mod segment;
mod polygon;
mod triangle;

pub use glam::{DVec2, DVec3};

pub use bbox::AxisAlignedRectangle;
pub use segment::LineSegmentXZ;
pub use polygon::{PolygonWithHoles, SimplePolygon};
pub use triangle::{TriangleXYZ, TriangleXZ};

/// Tolerance for "same position" comparisons
pub const POSITION_EPSILON: f64 = 1e-9;

/// Lift a ground-plane position to 3D at the given elevation
pub fn xyz(pos: DVec2, ele: f64) -> DVec3 {
    DVec3::new(pos.x, ele, pos.y)
}

/// Project a 3D position onto the ground plane
pub fn xz(pos: DVec3) -> DVec2 {
    DVec2::new(pos.x, pos.z)
}
