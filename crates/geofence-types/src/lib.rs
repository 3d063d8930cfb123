//! Shared type definitions for the geofence monitoring engine.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace. Types defined here flow downstream to `TypeScript` via
//! `ts-rs` for the location-safety dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Subject and area identifiers
//! - [`enums`] -- Risk levels and crossing directions
//! - [`structs`] -- Points, shapes, areas, positions, and evaluation payloads

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{CrossingKind, RiskLevel};
pub use ids::{AreaId, SubjectId};
pub use structs::{
    Area, AreaSummary, Circle, CrossingEvent, EvaluationCycle, Point, Polygon, Position,
    RawSample, Shape,
};
