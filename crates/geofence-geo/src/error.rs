//! Error types for the `geofence-geo` crate.
//!
//! None of these errors are fatal to monitoring: an invalid sample point is
//! dropped by the caller and a malformed area is skipped by the evaluator.

use geofence_types::AreaId;

/// Errors produced while validating or evaluating geometry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// A position lies outside the valid latitude/longitude range or is not
    /// finite.
    #[error("invalid coordinate: lat {lat}, lng {lng}")]
    InvalidCoordinate {
        /// Offending latitude.
        lat: f64,
        /// Offending longitude.
        lng: f64,
    },

    /// An area's shape contains a point outside the valid range.
    #[error("area {area} has an invalid coordinate: lat {lat}, lng {lng}")]
    InvalidAreaCoordinate {
        /// The area being validated.
        area: AreaId,
        /// Offending latitude.
        lat: f64,
        /// Offending longitude.
        lng: f64,
    },

    /// An area's shape is structurally unusable (too few vertices,
    /// non-positive radius).
    #[error("area {area} is malformed: {reason}")]
    MalformedArea {
        /// The area being validated.
        area: AreaId,
        /// What is wrong with the shape.
        reason: String,
    },
}
