//! Event sink that turns cycles into structured log lines.
//!
//! Every crossing becomes one `info!` line (`warn!` for high-risk areas);
//! position updates without crossings are logged at `debug!`. Errors are
//! logged at `warn!`.

use geofence_core::{EventSink, MonitorError};
use geofence_types::{CrossingKind, EvaluationCycle, RiskLevel, SubjectId};
use tracing::{debug, info, warn};

/// Logs every cycle of one or more subjects.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    /// Human-readable label included in every line (e.g. the track file).
    label: String,
}

impl LogSink {
    /// A sink tagging its lines with `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl EventSink for LogSink {
    fn on_cycle(&mut self, cycle: &EvaluationCycle) {
        if !cycle.has_crossings() {
            debug!(
                label = %self.label,
                subject = %cycle.subject,
                lat = cycle.position.lat,
                lng = cycle.position.lng,
                inside = cycle.inside.len(),
                "Position update"
            );
            return;
        }

        for event in cycle.events() {
            let direction = match event.kind {
                CrossingKind::Entered => "entered",
                CrossingKind::Exited => "exited",
            };
            if event.area.risk_level == RiskLevel::High && event.kind == CrossingKind::Entered {
                warn!(
                    label = %self.label,
                    subject = %event.subject,
                    area_id = %event.area.id,
                    area_name = %event.area.name,
                    risk_level = %event.area.risk_level,
                    "Subject entered high-risk area"
                );
            } else {
                info!(
                    label = %self.label,
                    subject = %event.subject,
                    area_id = %event.area.id,
                    area_name = %event.area.name,
                    risk_level = %event.area.risk_level,
                    direction,
                    "Area boundary crossed"
                );
            }
        }
    }

    fn on_error(&mut self, subject: SubjectId, error: &MonitorError) {
        warn!(label = %self.label, subject = %subject, error = %error, "Monitoring error");
    }
}
