//! Containment evaluation: which active areas contain a position.

use geofence_types::{AreaId, AreaSummary, Point};
use tracing::trace;

use crate::error::GeoError;
use crate::geometry::area_contains;
use crate::registry::RegistrySnapshot;

/// The set of areas containing a position, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Containment {
    /// Version of the snapshot this containment was computed against.
    version: u64,
    /// Containing areas; identifiers are unique because snapshot ids are.
    areas: Vec<AreaSummary>,
}

impl Containment {
    /// Build a containment directly. Mostly useful in tests.
    pub const fn new(version: u64, areas: Vec<AreaSummary>) -> Self {
        Self { version, areas }
    }

    /// Snapshot version used for the evaluation.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Containing areas in registry order.
    pub fn areas(&self) -> &[AreaSummary] {
        &self.areas
    }

    /// Consume the containment, yielding the area summaries.
    pub fn into_areas(self) -> Vec<AreaSummary> {
        self.areas
    }

    /// Identifiers of the containing areas.
    pub fn ids(&self) -> impl Iterator<Item = &AreaId> {
        self.areas.iter().map(|area| &area.id)
    }

    /// Whether `id` is among the containing areas.
    pub fn contains(&self, id: &AreaId) -> bool {
        self.areas.iter().any(|area| &area.id == id)
    }

    /// Number of containing areas.
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Whether no area contains the position.
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

/// Compute which active areas of `snapshot` contain `point`.
///
/// Malformed areas are skipped without aborting the evaluation; every
/// remaining area is still tested.
///
/// # Errors
///
/// Returns [`GeoError::InvalidCoordinate`] if `point` itself is outside the
/// valid coordinate range.
pub fn evaluate(point: Point, snapshot: &RegistrySnapshot) -> Result<Containment, GeoError> {
    if !point.is_valid() {
        return Err(GeoError::InvalidCoordinate {
            lat: point.lat,
            lng: point.lng,
        });
    }

    let areas = snapshot
        .active_areas()
        .filter(|area| match area_contains(area, point) {
            Ok(inside) => inside,
            Err(error) => {
                trace!(area_id = %area.id, error = %error, "skipping malformed area");
                false
            }
        })
        .map(geofence_types::Area::summary)
        .collect();

    Ok(Containment {
        version: snapshot.version(),
        areas,
    })
}
