//! The area registry: the current set of geofence definitions.
//!
//! The registry hands out immutable, versioned [`RegistrySnapshot`]s. An
//! evaluation cycle works against one snapshot from start to finish, and
//! [`AreaRegistry::replace_all`] swaps in a whole new snapshot under a write
//! lock, so concurrent readers observe either the old list or the new one,
//! never a mix.
//!
//! Snapshots are shared through [`Arc`]; holding one does not block
//! replacement.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use geofence_types::{Area, AreaId};
use tracing::{info, warn};

use crate::error::GeoError;
use crate::geometry::validate_area;

/// An immutable view of the registry at one point in time.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    /// Incremented on every replacement; 0 for the initial empty registry.
    version: u64,
    /// Areas in caller-supplied order, identifiers unique.
    areas: Vec<Area>,
}

impl RegistrySnapshot {
    /// Build a snapshot from an area list, dropping repeated identifiers
    /// (the first occurrence wins).
    fn build(version: u64, areas: Vec<Area>) -> (Self, Vec<AreaId>) {
        let mut seen = HashSet::with_capacity(areas.len());
        let mut duplicates = Vec::new();
        let mut kept = Vec::with_capacity(areas.len());

        for area in areas {
            if seen.insert(area.id.clone()) {
                kept.push(area);
            } else {
                duplicates.push(area.id);
            }
        }

        (
            Self {
                version,
                areas: kept,
            },
            duplicates,
        )
    }

    /// Version number of this snapshot.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Every area, active or not, in registry order.
    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    /// Active areas in registry order. This order drives the emission order
    /// of `entered` events.
    pub fn active_areas(&self) -> impl Iterator<Item = &Area> {
        self.areas.iter().filter(|area| area.active)
    }

    /// Look up an area by identifier, active or not.
    pub fn get(&self, id: &AreaId) -> Option<&Area> {
        self.areas.iter().find(|area| &area.id == id)
    }

    /// Number of areas, including inactive ones.
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Whether the snapshot holds no areas at all.
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Number of active areas.
    pub fn active_count(&self) -> usize {
        self.active_areas().count()
    }
}

/// Outcome of a [`AreaRegistry::replace_all`] call.
#[derive(Debug, Clone, Default)]
pub struct ReplaceReport {
    /// Version of the snapshot that was installed.
    pub version: u64,
    /// Number of areas in the new snapshot.
    pub accepted: usize,
    /// Identifiers that appeared more than once; later copies were dropped.
    pub duplicates: Vec<AreaId>,
    /// Areas kept in the registry whose shape cannot be evaluated. The
    /// evaluator skips them.
    pub malformed: Vec<GeoError>,
}

/// Shared, atomically replaceable collection of areas.
///
/// Typically wrapped in an [`Arc`] and shared by every subject's driver.
#[derive(Debug, Default)]
pub struct AreaRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl AreaRegistry {
    /// Create an empty registry (version 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-loaded with `areas`.
    pub fn with_areas(areas: Vec<Area>) -> Self {
        let registry = Self::new();
        registry.replace_all(areas);
        registry
    }

    /// The current snapshot. Cheap: clones an [`Arc`].
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Active areas of the current snapshot, in registry order.
    pub fn active_areas(&self) -> Vec<Area> {
        self.snapshot().active_areas().cloned().collect()
    }

    /// Replace the whole area list.
    ///
    /// Nothing from the previous snapshot is retained. Subjects inside an
    /// area that is absent from the new list see an exit on their next
    /// evaluation cycle. Duplicate identifiers are dropped (first wins) and
    /// malformed shapes are reported but kept, so that fixing a shape later
    /// does not change area order.
    pub fn replace_all(&self, areas: Vec<Area>) -> ReplaceReport {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let version = guard.version.saturating_add(1);
        let (snapshot, duplicates) = RegistrySnapshot::build(version, areas);
        let malformed: Vec<GeoError> = snapshot
            .areas()
            .iter()
            .filter_map(|area| validate_area(area).err())
            .collect();
        let accepted = snapshot.len();
        let active = snapshot.active_count();
        *guard = Arc::new(snapshot);
        drop(guard);

        for id in &duplicates {
            warn!(area_id = %id, version, "duplicate area id dropped from registry");
        }
        for error in &malformed {
            warn!(version, error = %error, "area will be skipped during evaluation");
        }
        info!(version, accepted, active, "area registry replaced");

        ReplaceReport {
            version,
            accepted,
            duplicates,
            malformed,
        }
    }
}
