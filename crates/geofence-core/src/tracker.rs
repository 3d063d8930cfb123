//! Per-subject crossing state machine.
//!
//! Every area is either `Outside` (the initial state) or `Inside` from the
//! subject's point of view. Each evaluation cycle hands the tracker the new
//! inside-set; the tracker diffs it against the previous one and reports
//! the transitions. Feeding the same inside-set twice in a row reports
//! nothing the second time.
//!
//! # Ordering
//!
//! - `entered` follows the order of the new inside-set (registry order).
//! - `exited` follows the order in which the areas were originally entered.
//! - The stored inside-set keeps retained areas in their original position
//!   and appends newly entered areas at the end.
//!
//! A tracker belongs to exactly one subject and is never shared.

use std::collections::HashSet;

use geofence_types::{AreaId, AreaSummary};

/// Transitions produced by one [`CrossingTracker::update`].
///
/// An area never appears in both lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Crossings {
    /// Areas the subject moved into, in registry order.
    pub entered: Vec<AreaSummary>,
    /// Areas the subject left (or that vanished), in original entry order.
    pub exited: Vec<AreaSummary>,
}

impl Crossings {
    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }
}

/// Deduplicating inside-set diff for a single subject.
#[derive(Debug, Clone, Default)]
pub struct CrossingTracker {
    inside: Vec<AreaSummary>,
}

impl CrossingTracker {
    /// A tracker with every area in the `Outside` state.
    pub const fn new() -> Self {
        Self { inside: Vec::new() }
    }

    /// Diff `now_inside` against the previous inside-set and adopt it.
    ///
    /// Repeated identifiers in `now_inside` are collapsed to their first
    /// occurrence.
    pub fn update(&mut self, now_inside: Vec<AreaSummary>) -> Crossings {
        let mut seen = HashSet::with_capacity(now_inside.len());
        let current: Vec<AreaSummary> = now_inside
            .into_iter()
            .filter(|area| seen.insert(area.id.clone()))
            .collect();

        let entered: Vec<AreaSummary> = current
            .iter()
            .filter(|area| !self.is_inside(&area.id))
            .cloned()
            .collect();

        let mut retained = Vec::with_capacity(current.len());
        let mut exited = Vec::new();
        for previous in self.inside.drain(..) {
            // Prefer the fresh summary so renamed areas carry their new name.
            match current.iter().find(|area| area.id == previous.id) {
                Some(fresh) => retained.push(fresh.clone()),
                None => exited.push(previous),
            }
        }

        retained.extend(entered.iter().cloned());
        self.inside = retained;

        Crossings { entered, exited }
    }

    /// Current inside-set in insertion order.
    pub fn inside(&self) -> &[AreaSummary] {
        &self.inside
    }

    /// Identifiers of the current inside-set in insertion order.
    pub fn inside_ids(&self) -> Vec<AreaId> {
        self.inside.iter().map(|area| area.id.clone()).collect()
    }

    /// Whether the subject is currently inside `id`.
    pub fn is_inside(&self, id: &AreaId) -> bool {
        self.inside.iter().any(|area| &area.id == id)
    }

    /// Forget all state; every area returns to `Outside` without emitting
    /// exits.
    pub fn reset(&mut self) {
        self.inside.clear();
    }
}
