//! Recorded-track position source.
//!
//! A track is a JSON-lines file, one raw sample per line:
//!
//! ```text
//! {"lat": 51.5007, "lng": -0.1246, "accuracy": 8.0}
//! {"lat": 51.5010, "lng": -0.1240, "timestamp": "2024-05-01T12:00:05Z"}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored; lines that do not
//! decode are logged and skipped. Every subscription replays the whole
//! track from the start, one sample per interval, then ends. A one-shot
//! request answers with the most recently replayed point as a fresh fix,
//! so `maximum_age` has nothing to reuse.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use geofence_core::{OneShot, PositionSource, SampleStream, SourceError, WatchOptions};
use geofence_types::RawSample;
use tracing::warn;

use crate::error::AppError;

/// Replays a recorded track at a fixed pace.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    samples: Arc<Vec<RawSample>>,
    interval: Duration,
    /// Index of the most recently replayed sample.
    cursor: Arc<AtomicUsize>,
}

impl ReplaySource {
    /// Replay `samples` with `interval` between them.
    pub fn new(samples: Vec<RawSample>, interval: Duration) -> Self {
        Self {
            samples: Arc::new(samples),
            interval,
            cursor: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Read a JSON-lines track from `path`.
    pub async fn from_file(path: &Path, interval: Duration) -> Result<Self, AppError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AppError::Track {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(parse_track(path, &contents), interval))
    }

    /// Number of samples in the track.
    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Decode a JSON-lines track, skipping lines that do not decode.
pub fn parse_track(path: &Path, contents: &str) -> Vec<RawSample> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .filter_map(|(index, line)| match serde_json::from_str::<RawSample>(line) {
            Ok(sample) => Some(sample),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    line = index.saturating_add(1),
                    error = %error,
                    "Skipping undecodable track line"
                );
                None
            }
        })
        .collect()
}

impl PositionSource for ReplaySource {
    fn watch(&self, _options: &WatchOptions) -> SampleStream {
        let samples = Arc::clone(&self.samples);
        let cursor = Arc::clone(&self.cursor);
        let interval = self.interval;
        stream::iter(0..samples.len())
            .then(move |index| {
                let samples = Arc::clone(&samples);
                let cursor = Arc::clone(&cursor);
                async move {
                    if index > 0 {
                        tokio::time::sleep(interval).await;
                    }
                    cursor.store(index, Ordering::Relaxed);
                    samples
                        .get(index)
                        .copied()
                        .ok_or_else(|| SourceError::Unavailable("track exhausted".to_owned()))
                }
            })
            .boxed()
    }

    fn current(&self, _options: &WatchOptions) -> OneShot {
        let sample = self.samples.get(self.cursor.load(Ordering::Relaxed)).copied();
        Box::pin(async move {
            sample.ok_or_else(|| SourceError::Unavailable("track is empty".to_owned()))
        })
    }
}
