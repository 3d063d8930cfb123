//! Location stream driver: one subject, one source, one sink.
//!
//! [`LocationDriver::start`] subscribes to a [`PositionSource`] and spawns a
//! tokio task that runs every received sample through the subject's
//! [`MonitorPipeline`] and hands the result to an [`EventSink`]. The task
//! is the only place samples of this subject are processed, so they are
//! handled strictly in arrival order.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --start--> Running --stop--> Idle
//!                    |
//!                    +-- stream ends --> resubscribe after delay (or Idle)
//! ```
//!
//! Errors never end the stream on their own: dropped samples and source
//! failures are reported through [`EventSink::on_error`] and the driver
//! keeps waiting for the next sample. Only [`LocationDriver::stop`] (or
//! dropping the driver) ends it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use geofence_geo::AreaRegistry;
use geofence_types::{Position, SubjectId};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::MonitorError;
use crate::pipeline::MonitorPipeline;
use crate::sample::normalize;
use crate::sink::EventSink;
use crate::source::{PositionSource, SampleStream, WatchOptions};

/// Default pause before re-subscribing to a source whose stream ended.
pub const DEFAULT_RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

/// Shortest accepted pause before re-subscribing.
pub const MIN_RESUBSCRIBE_DELAY: Duration = Duration::from_millis(100);

/// Driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Options passed to the source on every subscription.
    pub watch: WatchOptions,
    /// Pause before re-subscribing when the source's stream ends. `None`
    /// lets the driver go idle instead.
    pub resubscribe_delay: Option<Duration>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            watch: WatchOptions::default(),
            resubscribe_delay: Some(DEFAULT_RESUBSCRIBE_DELAY),
        }
    }
}

impl DriverOptions {
    /// Raise a resubscribe delay below [`MIN_RESUBSCRIBE_DELAY`] to it, so a
    /// source whose stream ends immediately cannot spin the driver.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            resubscribe_delay: self
                .resubscribe_delay
                .map(|delay| delay.max(MIN_RESUBSCRIBE_DELAY)),
            ..self
        }
    }
}

/// Handles of a running stream task.
#[derive(Debug)]
struct RunningStream {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Drives the location stream of a single subject.
#[derive(Debug)]
pub struct LocationDriver {
    subject: SubjectId,
    registry: Arc<AreaRegistry>,
    options: DriverOptions,
    running: Option<RunningStream>,
}

impl LocationDriver {
    /// Create an idle driver for `subject` evaluating against `registry`.
    ///
    /// A resubscribe delay below [`MIN_RESUBSCRIBE_DELAY`] is raised to it.
    pub fn new(subject: SubjectId, registry: Arc<AreaRegistry>, options: DriverOptions) -> Self {
        Self {
            subject,
            registry,
            options: options.clamped(),
            running: None,
        }
    }

    /// The monitored subject.
    pub const fn subject(&self) -> SubjectId {
        self.subject
    }

    /// The driver's configuration.
    pub const fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Whether a stream task is alive.
    ///
    /// A driver whose stream ended without a resubscribe delay reports
    /// `false` and may be started again.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Subscribe to `source` and start delivering cycles to `sink`.
    ///
    /// The subscription is live when this returns. Crossing state starts
    /// empty: the first valid sample enters every area containing it.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::AlreadyRunning`] if the stream is still running.
    /// - [`MonitorError::NoRuntime`] if called outside a tokio runtime.
    pub fn start<S>(
        &mut self,
        source: Arc<dyn PositionSource>,
        sink: S,
    ) -> Result<(), MonitorError>
    where
        S: EventSink + 'static,
    {
        if self.is_running() {
            return Err(MonitorError::AlreadyRunning {
                subject: self.subject,
            });
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|error| MonitorError::NoRuntime {
                reason: error.to_string(),
            })?;

        let stream = source.watch(&self.options.watch);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = runtime.spawn(run_stream(
            MonitorPipeline::new(self.subject, Arc::clone(&self.registry)),
            source,
            stream,
            self.options,
            sink,
            shutdown_rx,
        ));

        info!(
            subject = %self.subject,
            high_accuracy = self.options.watch.high_accuracy,
            timeout_ms = u64::try_from(self.options.watch.timeout.as_millis()).unwrap_or(u64::MAX),
            "Location stream started"
        );

        self.running = Some(RunningStream {
            shutdown: shutdown_tx,
            task,
        });
        Ok(())
    }

    /// Stop the stream and release the subscription.
    ///
    /// Idempotent. Once this returns the sink receives no further calls.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        // The task may already have exited; a closed channel is fine.
        let _ = running.shutdown.send(());
        if let Err(error) = running.task.await
            && error.is_panic()
        {
            warn!(subject = %self.subject, "Location stream task panicked");
        }
        info!(subject = %self.subject, "Location stream stopped");
    }
}

impl Drop for LocationDriver {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
        }
    }
}

/// Body of the per-subject stream task.
async fn run_stream<S: EventSink>(
    mut pipeline: MonitorPipeline,
    source: Arc<dyn PositionSource>,
    mut stream: SampleStream,
    options: DriverOptions,
    mut sink: S,
    mut shutdown: oneshot::Receiver<()>,
) {
    let subject = pipeline.subject();
    let mut samples: u64 = 0;

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            next = stream.next() => match next {
                Some(Ok(raw)) => {
                    samples = samples.saturating_add(1);
                    match pipeline.process(raw) {
                        Ok(cycle) => sink.on_cycle(&cycle),
                        Err(error) => {
                            warn!(subject = %subject, error = %error, "Dropped sample");
                            sink.on_error(subject, &error);
                        }
                    }
                }
                Some(Err(source_error)) => {
                    let error = MonitorError::from(source_error);
                    warn!(subject = %subject, error = %error, "Position source error");
                    sink.on_error(subject, &error);
                }
                None => {
                    let Some(delay) = options.resubscribe_delay else {
                        info!(subject = %subject, samples, "Location stream ended, going idle");
                        break;
                    };
                    info!(
                        subject = %subject,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Location stream ended, resubscribing"
                    );
                    tokio::select! {
                        biased;
                        _ = &mut shutdown => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                    stream = source.watch(&options.watch);
                }
            },
        }
    }

    pipeline.reset();
    debug!(subject = %subject, samples, "Location stream task finished");
}

/// Request a single position from `source`.
///
/// # Errors
///
/// - [`MonitorError::PositionUnavailable`] if no sample arrives within
///   [`WatchOptions::timeout`] or the source reports it cannot locate.
/// - [`MonitorError::SourceFailure`] for other source failures.
/// - Normalization errors if the returned sample is unusable.
pub async fn get_once(
    source: &dyn PositionSource,
    options: &WatchOptions,
) -> Result<Position, MonitorError> {
    let raw = match tokio::time::timeout(options.timeout, source.current(options)).await {
        Ok(result) => result?,
        Err(elapsed) => {
            return Err(MonitorError::PositionUnavailable {
                reason: format!(
                    "no position within {} ms ({elapsed})",
                    options.timeout.as_millis()
                ),
            });
        }
    };
    normalize(raw, Utc::now())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::sink::NoOpSink;
    use crate::source::BroadcastSource;

    use super::*;

    fn driver() -> LocationDriver {
        LocationDriver::new(
            SubjectId::new(),
            Arc::new(AreaRegistry::new()),
            DriverOptions::default(),
        )
    }

    #[test]
    fn start_outside_runtime_fails() {
        let mut driver = driver();
        let err = driver
            .start(Arc::new(BroadcastSource::new()), NoOpSink)
            .unwrap_err();
        assert!(matches!(err, MonitorError::NoRuntime { .. }));
        assert!(!driver.is_running());
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let mut driver = driver();
        let source: Arc<dyn PositionSource> = Arc::new(BroadcastSource::new());
        driver.start(Arc::clone(&source), NoOpSink).unwrap();
        let err = driver.start(source, NoOpSink).unwrap_err();
        assert_eq!(err, MonitorError::AlreadyRunning {
            subject: driver.subject()
        });
        driver.stop().await;
        assert!(!driver.is_running());
    }

    #[tokio::test]
    async fn stop_without_start_is_noop() {
        let mut driver = driver();
        driver.stop().await;
        driver.stop().await;
        assert!(!driver.is_running());
    }

    #[test]
    fn default_options() {
        let options = DriverOptions::default();
        assert_eq!(options.resubscribe_delay, Some(Duration::from_secs(5)));
        assert_eq!(options.watch, WatchOptions::default());
    }

    #[test]
    fn zero_resubscribe_delay_is_raised_to_the_floor() {
        let options = DriverOptions {
            resubscribe_delay: Some(Duration::ZERO),
            ..DriverOptions::default()
        };
        let driver = LocationDriver::new(SubjectId::new(), Arc::new(AreaRegistry::new()), options);
        assert_eq!(driver.options().resubscribe_delay, Some(MIN_RESUBSCRIBE_DELAY));

        let idle = DriverOptions {
            resubscribe_delay: None,
            ..DriverOptions::default()
        };
        assert_eq!(idle.clamped(), idle);
        assert_eq!(DriverOptions::default().clamped(), DriverOptions::default());
    }
}
