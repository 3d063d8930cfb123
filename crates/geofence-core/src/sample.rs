//! Normalization of raw source samples into validated positions.

use chrono::{DateTime, Utc};
use geofence_types::{Point, Position, RawSample};

use crate::error::MonitorError;

/// Turn a raw sample into a [`Position`].
///
/// A missing accuracy becomes `0.0` and a missing timestamp becomes `now`.
///
/// # Errors
///
/// - [`MonitorError::MalformedSample`] if latitude or longitude is missing,
///   or the accuracy is negative or not finite.
/// - [`MonitorError::InvalidCoordinate`] if the coordinates are out of range.
pub fn normalize(raw: RawSample, now: DateTime<Utc>) -> Result<Position, MonitorError> {
    let lat = raw.lat.ok_or_else(|| MonitorError::MalformedSample {
        reason: "missing latitude".to_owned(),
    })?;
    let lng = raw.lng.ok_or_else(|| MonitorError::MalformedSample {
        reason: "missing longitude".to_owned(),
    })?;

    if !Point::new(lat, lng).is_valid() {
        return Err(MonitorError::InvalidCoordinate { lat, lng });
    }

    let accuracy = raw.accuracy.unwrap_or(0.0);
    if !accuracy.is_finite() || accuracy < 0.0 {
        return Err(MonitorError::MalformedSample {
            reason: format!("accuracy must be a non-negative number of meters, got {accuracy}"),
        });
    }

    Ok(Position {
        lat,
        lng,
        accuracy,
        timestamp: raw.timestamp.unwrap_or(now),
    })
}
