//! The synchronous per-sample pipeline: normalize, evaluate, diff.
//!
//! [`MonitorPipeline`] is what the driver runs for every sample it receives.
//! It holds the subject's [`CrossingTracker`] and a handle on the shared
//! [`AreaRegistry`]; each cycle evaluates against one snapshot, so a
//! concurrent `replace_all` is either fully visible to a cycle or not at
//! all.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use geofence_geo::{AreaRegistry, evaluate};
use geofence_types::{EvaluationCycle, Position, RawSample, SubjectId};
use tracing::debug;

use crate::error::MonitorError;
use crate::sample::normalize;
use crate::tracker::CrossingTracker;

/// Per-subject evaluation state.
#[derive(Debug)]
pub struct MonitorPipeline {
    subject: SubjectId,
    registry: Arc<AreaRegistry>,
    tracker: CrossingTracker,
}

impl MonitorPipeline {
    /// Create a pipeline for `subject` with every area initially `Outside`.
    pub const fn new(subject: SubjectId, registry: Arc<AreaRegistry>) -> Self {
        Self {
            subject,
            registry,
            tracker: CrossingTracker::new(),
        }
    }

    /// Normalize `raw` against the current wall clock and run one cycle.
    pub fn process(&mut self, raw: RawSample) -> Result<EvaluationCycle, MonitorError> {
        self.process_at(raw, Utc::now())
    }

    /// Normalize `raw`, filling a missing timestamp with `now`, and run one
    /// cycle.
    ///
    /// An invalid sample leaves the tracker untouched.
    pub fn process_at(
        &mut self,
        raw: RawSample,
        now: DateTime<Utc>,
    ) -> Result<EvaluationCycle, MonitorError> {
        let position = normalize(raw, now)?;
        self.process_position(position)
    }

    /// Run one cycle for an already-normalized position.
    ///
    /// A position outside the valid coordinate range is rejected with
    /// [`MonitorError::InvalidCoordinate`] and leaves the tracker untouched.
    pub fn process_position(
        &mut self,
        position: Position,
    ) -> Result<EvaluationCycle, MonitorError> {
        let snapshot = self.registry.snapshot();
        // Area defects are skipped inside `evaluate`; only the point is rejected.
        let Ok(containment) = evaluate(position.point(), &snapshot) else {
            return Err(MonitorError::InvalidCoordinate {
                lat: position.lat,
                lng: position.lng,
            });
        };
        let crossings = self.tracker.update(containment.into_areas());

        if !crossings.is_empty() {
            debug!(
                subject = %self.subject,
                version = snapshot.version(),
                entered = crossings.entered.len(),
                exited = crossings.exited.len(),
                "Crossings detected"
            );
        }

        Ok(EvaluationCycle {
            subject: self.subject,
            position,
            entered: crossings.entered,
            exited: crossings.exited,
            inside: self.tracker.inside_ids(),
        })
    }

    /// The subject this pipeline evaluates.
    pub const fn subject(&self) -> SubjectId {
        self.subject
    }

    /// The subject's crossing state.
    pub const fn tracker(&self) -> &CrossingTracker {
        &self.tracker
    }

    /// Return every area to `Outside` without emitting exits.
    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use geofence_geo::destination_point;
    use geofence_types::{Area, Point};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn ids(areas: &[geofence_types::AreaSummary]) -> Vec<&str> {
        areas.iter().map(|a| a.id.as_str()).collect()
    }

    fn pipeline(areas: Vec<Area>) -> (MonitorPipeline, Arc<AreaRegistry>) {
        let registry = Arc::new(AreaRegistry::with_areas(areas));
        (MonitorPipeline::new(SubjectId::new(), Arc::clone(&registry)), registry)
    }

    #[test]
    fn circle_enter_stay_exit() {
        let origin = Point::new(0.0, 0.0);
        let (mut pipeline, _) = pipeline(vec![Area::circle("c1", "Circle one", origin, 1000.0)]);

        let first = pipeline.process_at(RawSample::from(origin), now()).unwrap();
        assert_eq!(ids(&first.entered), vec!["c1"]);
        assert!(first.exited.is_empty());

        let near = destination_point(origin, 90.0, 500.0);
        let second = pipeline.process_at(RawSample::from(near), now()).unwrap();
        assert!(!second.has_crossings());
        assert_eq!(second.inside.len(), 1);

        let far = destination_point(origin, 90.0, 2000.0);
        let third = pipeline.process_at(RawSample::from(far), now()).unwrap();
        assert!(third.entered.is_empty());
        assert_eq!(ids(&third.exited), vec!["c1"]);
        assert!(third.inside.is_empty());
    }

    #[test]
    fn same_position_twice_yields_nothing_new() {
        let (mut pipeline, _) =
            pipeline(vec![Area::circle("c1", "Circle", Point::new(10.0, 10.0), 50.0)]);
        let sample = RawSample::at(10.0, 10.0);
        assert!(pipeline.process_at(sample, now()).unwrap().has_crossings());
        assert!(!pipeline.process_at(sample, now()).unwrap().has_crossings());
    }

    #[test]
    fn removing_an_area_emits_an_implicit_exit() {
        let (mut pipeline, registry) = pipeline(vec![
            Area::circle("x", "X", Point::new(0.0, 0.0), 1000.0),
            Area::circle("y", "Y", Point::new(0.0, 0.0), 1000.0),
        ]);
        let sample = RawSample::at(0.0, 0.0);
        let first = pipeline.process_at(sample, now()).unwrap();
        assert_eq!(ids(&first.entered), vec!["x", "y"]);

        registry.replace_all(vec![Area::circle("y", "Y", Point::new(0.0, 0.0), 1000.0)]);
        let second = pipeline.process_at(sample, now()).unwrap();
        assert!(second.entered.is_empty());
        assert_eq!(ids(&second.exited), vec!["x"]);
        assert_eq!(second.inside.len(), 1);
    }

    #[test]
    fn deactivated_area_counts_as_exit() {
        let area = Area::circle("x", "X", Point::new(0.0, 0.0), 1000.0);
        let (mut pipeline, registry) = pipeline(vec![area.clone()]);
        pipeline.process_at(RawSample::at(0.0, 0.0), now()).unwrap();

        registry.replace_all(vec![area.with_active(false)]);
        let cycle = pipeline.process_at(RawSample::at(0.0, 0.0), now()).unwrap();
        assert_eq!(ids(&cycle.exited), vec!["x"]);
    }

    #[test]
    fn invalid_sample_leaves_state_untouched() {
        let (mut pipeline, _) =
            pipeline(vec![Area::circle("c1", "Circle", Point::new(0.0, 0.0), 1000.0)]);
        pipeline.process_at(RawSample::at(0.0, 0.0), now()).unwrap();

        let err = pipeline.process_at(RawSample::at(95.0, 0.0), now()).unwrap_err();
        assert_eq!(err, MonitorError::InvalidCoordinate { lat: 95.0, lng: 0.0 });
        assert!(pipeline.tracker().is_inside(&"c1".into()));
    }

    #[test]
    fn out_of_range_position_is_rejected_without_touching_state() {
        let (mut pipeline, _) =
            pipeline(vec![Area::circle("c1", "Circle", Point::new(0.0, 0.0), 1000.0)]);
        pipeline.process_at(RawSample::at(0.0, 0.0), now()).unwrap();

        let position = Position {
            lat: 0.0,
            lng: 181.0,
            accuracy: 0.0,
            timestamp: now(),
        };
        let err = pipeline.process_position(position).unwrap_err();
        assert_eq!(err, MonitorError::InvalidCoordinate { lat: 0.0, lng: 181.0 });
        assert!(pipeline.tracker().is_inside(&"c1".into()));
    }

    #[test]
    fn cycle_wire_shape() {
        let (mut pipeline, _) = pipeline(vec![
            Area::circle("c1", "Circle one", Point::new(0.0, 0.0), 1000.0)
                .with_risk(geofence_types::RiskLevel::High),
        ]);
        let cycle = pipeline.process_at(RawSample::at(0.0, 0.0), now()).unwrap();

        let json = serde_json::to_value(&cycle).unwrap();
        assert_eq!(json["subject"], serde_json::json!(pipeline.subject().to_string()));
        assert_eq!(
            json["entered"],
            serde_json::json!([{"id": "c1", "name": "Circle one", "risk_level": "high"}])
        );
        assert_eq!(json["exited"], serde_json::json!([]));
        assert_eq!(json["inside"], serde_json::json!(["c1"]));
        assert_eq!(json["position"]["lat"], serde_json::json!(0.0));

        let decoded: EvaluationCycle = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, cycle);
    }

    #[test]
    fn malformed_polygon_does_not_block_other_areas() {
        let (mut pipeline, _) = pipeline(vec![
            Area::polygon(
                "broken",
                "Two points",
                vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
            ),
            Area::circle("ok", "Circle", Point::new(0.0, 0.0), 100.0),
        ]);
        let cycle = pipeline.process_at(RawSample::at(0.0, 0.0), now()).unwrap();
        assert_eq!(ids(&cycle.entered), vec!["ok"]);
    }

    #[test]
    fn missing_timestamp_uses_supplied_clock() {
        let (mut pipeline, _) = pipeline(Vec::new());
        let cycle = pipeline.process_at(RawSample::at(1.0, 1.0), now()).unwrap();
        assert_eq!(cycle.position.timestamp, now());
        assert_eq!(cycle.subject, pipeline.subject());
    }
}
