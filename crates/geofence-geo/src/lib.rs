//! Geometry, area registry, and containment evaluation for the geofence
//! monitoring engine.
//!
//! Everything in this crate is synchronous and free of I/O.
//!
//! # Modules
//!
//! - [`error`] -- Error types for geometry validation and evaluation.
//! - [`geometry`] -- Ray-casting point-in-polygon, haversine distance,
//!   point-in-circle, and shape validation.
//! - [`registry`] -- [`AreaRegistry`] with copy-on-write, versioned
//!   snapshots.
//! - [`evaluator`] -- [`evaluate`] computes the set of active areas that
//!   contain a point.
//!
//! [`AreaRegistry`]: registry::AreaRegistry
//! [`evaluate`]: evaluator::evaluate

pub mod error;
pub mod evaluator;
pub mod geometry;
pub mod registry;

// Re-export primary types at crate root.
pub use error::GeoError;
pub use evaluator::{Containment, evaluate};
pub use geometry::{
    EARTH_RADIUS_M, area_contains, destination_point, haversine_distance_meters,
    point_in_circle, point_in_polygon, validate_area,
};
pub use registry::{AreaRegistry, RegistrySnapshot, ReplaceReport};
