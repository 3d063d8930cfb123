//! Core data structs: coordinates, shapes, areas, positions, and the
//! per-sample evaluation payload delivered to event sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{CrossingKind, RiskLevel};
use crate::ids::{AreaId, SubjectId};

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A geographic coordinate in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Point {
    /// Latitude, -90 to 90.
    pub lat: f64,
    /// Longitude, -180 to 180.
    pub lng: f64,
}

impl Point {
    /// Create a point from latitude and longitude.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside the valid ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<(f64, f64)> for Point {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

/// A closed polygon. The last vertex implicitly connects to the first.
///
/// Vertex order defines the boundary traversal; either winding works.
/// Self-intersecting polygons are accepted but give no guaranteed result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Polygon {
    /// Boundary vertices; at least three are needed to enclose anything.
    pub vertices: Vec<Point>,
}

impl Polygon {
    /// Create a polygon from its vertices.
    pub const fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }
}

/// A circle on the Earth's surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Circle {
    /// Center of the circle.
    pub center: Point,
    /// Radius in meters; must be positive.
    pub radius: f64,
}

impl Circle {
    /// Create a circle from its center and radius in meters.
    pub const fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }
}

/// The region covered by an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Shape {
    /// Polygonal region, tested with ray casting.
    Polygon(Polygon),
    /// Circular region, tested with great-circle distance.
    Circle(Circle),
}

// ---------------------------------------------------------------------------
// Areas
// ---------------------------------------------------------------------------

/// A geofence definition.
///
/// Inactive areas stay in the registry but are skipped by evaluation, so
/// they can be re-activated without re-registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Area {
    /// Unique identifier within a registry snapshot.
    pub id: AreaId,
    /// Display name.
    pub name: String,
    /// Free-form description shown alongside notifications.
    #[serde(default)]
    pub description: String,
    /// Risk classification.
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Whether the area takes part in evaluation.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Region covered by the area.
    pub shape: Shape,
}

const fn default_active() -> bool {
    true
}

impl Area {
    /// Create an active, medium-risk area with an empty description.
    pub fn new(id: impl Into<AreaId>, name: impl Into<String>, shape: Shape) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            risk_level: RiskLevel::default(),
            active: true,
            shape,
        }
    }

    /// Shorthand for a circular area.
    pub fn circle(
        id: impl Into<AreaId>,
        name: impl Into<String>,
        center: Point,
        radius: f64,
    ) -> Self {
        Self::new(id, name, Shape::Circle(Circle::new(center, radius)))
    }

    /// Shorthand for a polygonal area.
    pub fn polygon(id: impl Into<AreaId>, name: impl Into<String>, vertices: Vec<Point>) -> Self {
        Self::new(id, name, Shape::Polygon(Polygon::new(vertices)))
    }

    /// Set the risk level.
    #[must_use]
    pub const fn with_risk(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the active flag.
    #[must_use]
    pub const fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// The fields a consumer needs to act on a crossing.
    pub fn summary(&self) -> AreaSummary {
        AreaSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            risk_level: self.risk_level,
        }
    }
}

/// Projection of an [`Area`] carried by crossing events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AreaSummary {
    /// Area identifier.
    pub id: AreaId,
    /// Area display name.
    pub name: String,
    /// Area risk classification.
    pub risk_level: RiskLevel,
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// A normalized, validated position sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
    /// Horizontal accuracy radius in meters (never negative).
    pub accuracy: f64,
    /// When the sample was taken.
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// The coordinate part of the sample.
    pub const fn point(&self) -> Point {
        Point::new(self.lat, self.lng)
    }
}

/// A sample as produced by a positioning source, before normalization.
///
/// Every field is optional because real sources omit fields: a missing
/// coordinate makes the sample invalid, a missing accuracy or timestamp is
/// filled in during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RawSample {
    /// Latitude in decimal degrees.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude in decimal degrees.
    #[serde(default)]
    pub lng: Option<f64>,
    /// Accuracy radius in meters.
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Acquisition time reported by the source.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawSample {
    /// A sample carrying only coordinates.
    pub const fn at(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            accuracy: None,
            timestamp: None,
        }
    }

    /// Set the accuracy radius in meters.
    #[must_use]
    pub const fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Set the acquisition time.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

impl From<Point> for RawSample {
    fn from(point: Point) -> Self {
        Self::at(point.lat, point.lng)
    }
}

// ---------------------------------------------------------------------------
// Crossing payloads
// ---------------------------------------------------------------------------

/// A single boundary crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CrossingEvent {
    /// The subject that crossed.
    pub subject: SubjectId,
    /// Entered or exited.
    pub kind: CrossingKind,
    /// The area whose boundary was crossed.
    pub area: AreaSummary,
    /// Position at which the crossing was detected.
    pub position: Position,
}

/// Everything produced by one evaluation cycle of one subject.
///
/// Delivered to the event sink for every valid sample, including samples
/// that caused no crossing (the position is the current-location update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EvaluationCycle {
    /// The monitored subject.
    pub subject: SubjectId,
    /// The normalized sample that drove this cycle.
    pub position: Position,
    /// Areas entered this cycle, in registry order.
    pub entered: Vec<AreaSummary>,
    /// Areas exited this cycle, in the order they were entered.
    pub exited: Vec<AreaSummary>,
    /// Identifiers of every area containing the subject after this cycle.
    pub inside: Vec<AreaId>,
}

impl EvaluationCycle {
    /// Whether any area was entered or exited.
    pub fn has_crossings(&self) -> bool {
        !self.entered.is_empty() || !self.exited.is_empty()
    }

    /// Flatten the cycle into individual events, entered before exited.
    pub fn events(&self) -> Vec<CrossingEvent> {
        let entered = self
            .entered
            .iter()
            .map(|area| (CrossingKind::Entered, area));
        let exited = self.exited.iter().map(|area| (CrossingKind::Exited, area));
        entered
            .chain(exited)
            .map(|(kind, area)| CrossingEvent {
                subject: self.subject,
                kind,
                area: area.clone(),
                position: self.position,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_validity_bounds_are_inclusive() {
        assert!(Point::new(90.0, 180.0).is_valid());
        assert!(Point::new(-90.0, -180.0).is_valid());
        assert!(!Point::new(90.5, 0.0).is_valid());
        assert!(!Point::new(0.0, -180.1).is_valid());
        assert!(!Point::new(f64::NAN, 0.0).is_valid());
        assert!(!Point::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn area_deserializes_with_defaults() {
        let json = r#"{
            "id": "harbor",
            "name": "Harbor",
            "shape": {"type": "circle", "center": {"lat": 1.0, "lng": 2.0}, "radius": 250.0}
        }"#;
        let area: Area = serde_json::from_str(json).unwrap();
        assert_eq!(area.id, AreaId::from("harbor"));
        assert!(area.active);
        assert_eq!(area.risk_level, RiskLevel::Medium);
        assert!(area.description.is_empty());
        assert!(matches!(area.shape, Shape::Circle(_)));
    }

    #[test]
    fn polygon_area_uses_type_tag() {
        let area = Area::polygon(
            "square",
            "Square",
            vec![
                Point::new(0.0, 0.0),
                Point::new(0.0, 1.0),
                Point::new(1.0, 1.0),
            ],
        )
        .with_risk(RiskLevel::High);
        let value = serde_json::to_value(&area).unwrap();
        assert_eq!(value["shape"]["type"], "polygon");
        assert_eq!(value["shape"]["vertices"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["risk_level"], "high");
    }

    #[test]
    fn raw_sample_fields_are_optional() {
        let raw: RawSample = serde_json::from_str(r#"{"lat": 10.0}"#).unwrap();
        assert_eq!(raw.lat, Some(10.0));
        assert!(raw.lng.is_none());
        assert!(raw.accuracy.is_none());
        assert!(raw.timestamp.is_none());
    }

    #[test]
    fn cycle_events_list_entered_before_exited() {
        let subject = SubjectId::new();
        let position = Position {
            lat: 0.0,
            lng: 0.0,
            accuracy: 5.0,
            timestamp: Utc::now(),
        };
        let a = Area::circle("a", "A", Point::new(0.0, 0.0), 10.0).summary();
        let b = Area::circle("b", "B", Point::new(0.0, 0.0), 10.0).summary();
        let cycle = EvaluationCycle {
            subject,
            position,
            entered: vec![a.clone()],
            exited: vec![b.clone()],
            inside: vec![a.id.clone()],
        };

        let events = cycle.events();
        assert!(cycle.has_crossings());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, CrossingKind::Entered);
        assert_eq!(events[0].area, a);
        assert_eq!(events[1].kind, CrossingKind::Exited);
        assert_eq!(events[1].area, b);
    }
}
