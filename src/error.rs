//! Error taxonomy for map conversion
//!
//! Per-element failures (`GeometryError`, `MissingReferenceError`) are logged
//! and the element or pair is skipped. `ConstraintUnsatisfiableError` is
//! reported after a best-effort elevation has been applied.
//! `BoundsTooLargeError` is the only error a caller is expected to react to,
//! usually by retrying with `fail_on_large_bbox` disabled.

use thiserror::Error;

use crate::map_data::ElementId;

/// Invalid or unprocessable 2D geometry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("polygon needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),
    #[error("polygon ring is self-intersecting")]
    SelfIntersecting,
    #[error("geometry contains a non-finite coordinate")]
    NonFinite,
    #[error("polygon has zero area")]
    ZeroArea,
    #[error("ring does not close")]
    UnclosedRing,
    #[error("polygon clipping failed: {0}")]
    ClippingFailed(String),
    #[error("triangulation failed: {0}")]
    TriangulationFailed(String),
}

/// A way or relation references an element that is not part of the input
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{element} references missing {missing}")]
pub struct MissingReferenceError {
    pub element: ElementId,
    pub missing: ElementId,
}

/// Some elevation constraints could not be satisfied simultaneously
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "{unsatisfied_constraints} elevation constraints could not be satisfied \
     ({failed_components} of {total_components} connector groups failed)"
)]
pub struct ConstraintUnsatisfiableError {
    pub failed_components: usize,
    pub total_components: usize,
    pub unsatisfied_constraints: usize,
}

/// The input covers a larger area than the configured limit
#[derive(Debug, Clone, PartialEq, Error)]
#[error("data bounds of {width:.0} x {height:.0} m exceed the limit of {limit:.0} m")]
pub struct BoundsTooLargeError {
    pub width: f64,
    pub height: f64,
    pub limit: f64,
}

/// Errors surfaced by a conversion run
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    MissingReference(#[from] MissingReferenceError),
    #[error(transparent)]
    ConstraintUnsatisfiable(#[from] ConstraintUnsatisfiableError),
    #[error(transparent)]
    BoundsTooLarge(#[from] BoundsTooLargeError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
