//! Elevation connectors and constraint solving
//!
//! World objects register `EleConnector`s (2D points whose elevation is
//! unknown) and vertical constraints between them. The enforcer then
//! assigns every connector an elevation.
//!
//! # Submodules
//! - `connector` - Connectors, ground states and per-object connector groups
//! - `enforcer` - Constraint collection and iterative relaxation solver

mod connector;
mod enforcer;

pub use connector::{ConnectorId, EleConnector, EleConnectorGroup, GroundState};
pub use enforcer::{
    ConstraintType, EleConstraintEnforcer, EnforcerState, VerticalConstraint,
};
