//! Error types for the monitoring pipeline.
//!
//! [`MonitorError`] is what event sinks receive through
//! [`EventSink::on_error`](crate::sink::EventSink::on_error). Apart from
//! [`MonitorError::AlreadyRunning`] and [`MonitorError::NoRuntime`], none of
//! these stop a running stream; the caller decides whether to stop.

use geofence_types::SubjectId;

use crate::source::SourceError;

/// Errors surfaced by the location stream driver and the sample pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MonitorError {
    /// The sample's coordinates are outside the valid range or not finite.
    /// The sample is dropped.
    #[error("invalid coordinate: lat {lat}, lng {lng}")]
    InvalidCoordinate {
        /// Offending latitude.
        lat: f64,
        /// Offending longitude.
        lng: f64,
    },

    /// The sample lacks a coordinate or carries an unusable accuracy.
    /// The sample is dropped.
    #[error("malformed sample: {reason}")]
    MalformedSample {
        /// What is wrong with the sample.
        reason: String,
    },

    /// The source could not produce a position in time. Continuous streams
    /// keep going; one-shot requests fail.
    #[error("position unavailable: {reason}")]
    PositionUnavailable {
        /// Why no position could be obtained.
        reason: String,
    },

    /// The positioning mechanism itself failed (e.g. permission denied).
    #[error("position source failure: {reason}")]
    SourceFailure {
        /// Description reported by the source.
        reason: String,
    },

    /// `start` was called on a driver whose stream is still running.
    #[error("location stream for subject {subject} is already running")]
    AlreadyRunning {
        /// The subject whose driver is running.
        subject: SubjectId,
    },

    /// `start` was called outside a tokio runtime.
    #[error("no async runtime available: {reason}")]
    NoRuntime {
        /// Runtime lookup failure.
        reason: String,
    },
}

impl From<SourceError> for MonitorError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::Timeout | SourceError::Unavailable(_) => Self::PositionUnavailable {
                reason: error.to_string(),
            },
            SourceError::PermissionDenied(_) | SourceError::Failure(_) => Self::SourceFailure {
                reason: error.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_map_to_position_unavailable() {
        let err = MonitorError::from(SourceError::Timeout);
        assert!(matches!(err, MonitorError::PositionUnavailable { .. }));
        let err = MonitorError::from(SourceError::Unavailable("no fix".to_owned()));
        assert!(matches!(
            err,
            MonitorError::PositionUnavailable { reason } if reason.contains("no fix")
        ));
    }

    #[test]
    fn permission_denied_maps_to_source_failure() {
        let err = MonitorError::from(SourceError::PermissionDenied("user refused".to_owned()));
        assert!(matches!(
            err,
            MonitorError::SourceFailure { reason } if reason.contains("user refused")
        ));
    }
}
