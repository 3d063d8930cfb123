//! Multi-subject orchestration.
//!
//! A [`MonitorHub`] owns one [`LocationDriver`] per subject. All drivers
//! evaluate against the same [`AreaRegistry`], so a single `replace_all`
//! reaches every subject on its next sample. Subjects share nothing else.

use std::collections::BTreeMap;
use std::sync::Arc;

use geofence_geo::AreaRegistry;
use geofence_types::SubjectId;
use tracing::info;

use crate::driver::{DriverOptions, LocationDriver};
use crate::error::MonitorError;
use crate::sink::EventSink;
use crate::source::PositionSource;

/// Owns the drivers of every monitored subject.
#[derive(Debug)]
pub struct MonitorHub {
    registry: Arc<AreaRegistry>,
    options: DriverOptions,
    drivers: BTreeMap<SubjectId, LocationDriver>,
}

impl MonitorHub {
    /// Create an empty hub whose drivers share `registry`.
    pub const fn new(registry: Arc<AreaRegistry>, options: DriverOptions) -> Self {
        Self {
            registry,
            options,
            drivers: BTreeMap::new(),
        }
    }

    /// The shared registry.
    pub const fn registry(&self) -> &Arc<AreaRegistry> {
        &self.registry
    }

    /// Start monitoring `subject`.
    ///
    /// A subject whose previous stream went idle is restarted with fresh
    /// crossing state.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::AlreadyRunning`] if `subject` is already watched.
    /// - [`MonitorError::NoRuntime`] if called outside a tokio runtime.
    pub fn watch_subject<S>(
        &mut self,
        subject: SubjectId,
        source: Arc<dyn PositionSource>,
        sink: S,
    ) -> Result<(), MonitorError>
    where
        S: EventSink + 'static,
    {
        let registry = &self.registry;
        let options = self.options;
        let driver = self
            .drivers
            .entry(subject)
            .or_insert_with(|| LocationDriver::new(subject, Arc::clone(registry), options));
        if let Err(error) = driver.start(source, sink) {
            if !matches!(error, MonitorError::AlreadyRunning { .. }) {
                self.drivers.remove(&subject);
            }
            return Err(error);
        }
        info!(subject = %subject, watched = self.drivers.len(), "Subject watched");
        Ok(())
    }

    /// Stop monitoring `subject`. Returns whether it was watched.
    pub async fn unwatch_subject(&mut self, subject: SubjectId) -> bool {
        let Some(mut driver) = self.drivers.remove(&subject) else {
            return false;
        };
        driver.stop().await;
        info!(subject = %subject, watched = self.drivers.len(), "Subject unwatched");
        true
    }

    /// Stop every driver and forget all subjects.
    pub async fn stop_all(&mut self) {
        let drivers = std::mem::take(&mut self.drivers);
        let count = drivers.len();
        for (_, mut driver) in drivers {
            driver.stop().await;
        }
        info!(stopped = count, "All subjects stopped");
    }

    /// Watched subjects in identifier order.
    pub fn subjects(&self) -> Vec<SubjectId> {
        self.drivers.keys().copied().collect()
    }

    /// Whether `subject` is watched and its stream is alive.
    pub fn is_running(&self, subject: SubjectId) -> bool {
        self.drivers
            .get(&subject)
            .is_some_and(LocationDriver::is_running)
    }

    /// Number of watched subjects.
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Whether no subject is watched.
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}
