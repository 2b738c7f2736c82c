//! Conversion of OpenStreetMap data into textured 3D scenes
//!
//! # Modules
//! - `math` - Geometry kernel for the ground plane and scene space
//! - `algorithms` - Polygon set operations and triangulation
//! - `osm` - Raw OSM data and the `.osm` reader
//! - `map_data` - Map elements built from OSM data
//! - `overlap` - Spatial index and overlap detection between elements
//! - `elevation` - Elevation connectors and constraint solving
//! - `mesh` - Materials, geometry, mesh store and processing steps
//! - `world` - 3D representations of map elements
//! - `conversion` - Conversion driver and log
//! - `export` - JSON scene export
//! - `config` - Conversion configuration and feature rules
//! - `error` - Error types

pub mod math;
pub mod algorithms;
pub mod osm;
pub mod map_data;
pub mod overlap;
pub mod elevation;
pub mod mesh;
pub mod world;
pub mod conversion;
pub mod export;
pub mod config;
pub mod error;
