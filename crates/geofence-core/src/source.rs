//! Position sources.
//!
//! [`PositionSource`] is the seam between the engine and whatever produces
//! positions (a platform location service, a GPS daemon, a recorded track).
//! A source offers a continuous subscription and a one-shot request, both
//! parameterized by [`WatchOptions`].
//!
//! Two sources ship with the crate:
//!
//! - [`BroadcastSource`] -- samples pushed in-process, fanned out to every
//!   subscriber. Used by the replay binary and by tests.
//! - [`PollingSource`] -- turns any source's one-shot call into a
//!   continuous stream by polling it on a fixed interval.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use geofence_types::RawSample;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default channel capacity for [`BroadcastSource`].
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Options handed to the source for both continuous and one-shot requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Ask the source for its most accurate positioning mode.
    pub high_accuracy: bool,
    /// How long a single request may take before it counts as unavailable.
    pub timeout: Duration,
    /// Maximum age of a cached sample the source may return instead of
    /// acquiring a fresh one. Zero means always acquire.
    pub maximum_age: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: DEFAULT_TIMEOUT,
            maximum_age: Duration::ZERO,
        }
    }
}

/// Errors reported by a position source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The user or platform refused access to positioning.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// No position could be determined right now.
    #[error("position unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete within [`WatchOptions::timeout`].
    #[error("timed out waiting for a position")]
    Timeout,

    /// Any other failure of the positioning mechanism.
    #[error("{0}")]
    Failure(String),
}

/// A continuous stream of raw samples or per-sample errors.
///
/// The stream ending means the subscription is gone; the driver decides
/// whether to subscribe again.
pub type SampleStream = BoxStream<'static, Result<RawSample, SourceError>>;

/// Something that produces positions.
///
/// Implementations must be cheap to call repeatedly: the driver calls
/// [`watch`](PositionSource::watch) once per (re)subscription.
pub trait PositionSource: Send + Sync {
    /// Subscribe to continuous updates.
    ///
    /// The subscription must be established by the time this returns, so
    /// samples produced immediately afterwards are not lost.
    fn watch(&self, options: &WatchOptions) -> SampleStream;

    /// Request a single sample.
    ///
    /// A source that caches fixes may answer with a sample no older than
    /// [`WatchOptions::maximum_age`] instead of acquiring a new one.
    fn current(&self, options: &WatchOptions) -> OneShot;
}

/// A pending one-shot request.
pub type OneShot = BoxFuture<'static, Result<RawSample, SourceError>>;

impl<S: PositionSource + ?Sized> PositionSource for Arc<S> {
    fn watch(&self, options: &WatchOptions) -> SampleStream {
        (**self).watch(options)
    }

    fn current(&self, options: &WatchOptions) -> OneShot {
        (**self).current(options)
    }
}

// ---------------------------------------------------------------------------
// BroadcastSource
// ---------------------------------------------------------------------------

/// In-process source fed through [`push`](BroadcastSource::push).
///
/// Every [`watch`](PositionSource::watch) call gets its own receiver; a
/// sample pushed while nobody is subscribed is discarded. A subscriber that
/// falls more than the channel capacity behind receives one
/// [`SourceError::Unavailable`] and then continues with the oldest retained
/// sample.
///
/// The most recently pushed sample is remembered with the instant it was
/// pushed; a one-shot request whose [`WatchOptions::maximum_age`] covers it
/// is answered immediately.
#[derive(Debug, Clone)]
pub struct BroadcastSource {
    sender: broadcast::Sender<Result<RawSample, SourceError>>,
    last: Arc<Mutex<Option<(Instant, RawSample)>>>,
}

impl BroadcastSource {
    /// Create a source with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create a source buffering up to `capacity` samples per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Publish a sample. Returns the number of subscribers that will see it.
    pub fn push(&self, sample: RawSample) -> usize {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some((Instant::now(), sample));
        self.sender.send(Ok(sample)).unwrap_or(0)
    }

    /// The last pushed sample, if it is no older than `maximum_age`.
    fn cached(&self, maximum_age: Duration) -> Option<RawSample> {
        if maximum_age.is_zero() {
            return None;
        }
        let last = *self.last.lock().unwrap_or_else(PoisonError::into_inner);
        last.filter(|(pushed, _)| pushed.elapsed() <= maximum_age)
            .map(|(_, sample)| sample)
    }

    /// Publish an error to every subscriber.
    pub fn fail(&self, error: SourceError) -> usize {
        self.sender.send(Err(error)).unwrap_or(0)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a broadcast receive outcome onto the stream item; `None` on close.
fn next_item(
    received: Result<Result<RawSample, SourceError>, RecvError>,
) -> Option<Result<RawSample, SourceError>> {
    match received {
        Ok(item) => Some(item),
        Err(RecvError::Lagged(skipped)) => Some(Err(SourceError::Unavailable(format!(
            "subscriber lagged, {skipped} samples skipped"
        )))),
        Err(RecvError::Closed) => None,
    }
}

impl PositionSource for BroadcastSource {
    fn watch(&self, _options: &WatchOptions) -> SampleStream {
        let receiver = self.sender.subscribe();
        stream::unfold(receiver, |mut receiver| async move {
            let item = next_item(receiver.recv().await)?;
            Some((item, receiver))
        })
        .boxed()
    }

    fn current(&self, options: &WatchOptions) -> OneShot {
        if let Some(sample) = self.cached(options.maximum_age) {
            return Box::pin(async move { Ok(sample) });
        }
        let mut receiver = self.sender.subscribe();
        Box::pin(async move {
            next_item(receiver.recv().await)
                .unwrap_or_else(|| Err(SourceError::Unavailable("source closed".to_owned())))
        })
    }
}

// ---------------------------------------------------------------------------
// PollingSource
// ---------------------------------------------------------------------------

/// Continuous stream built from repeated one-shot requests.
///
/// Each tick calls the inner source's [`current`](PositionSource::current)
/// bounded by [`WatchOptions::timeout`]; a request that runs over yields
/// [`SourceError::Timeout`] and polling continues on the next tick. The
/// stream never ends on its own.
#[derive(Clone)]
pub struct PollingSource {
    inner: Arc<dyn PositionSource>,
    interval: Duration,
}

impl PollingSource {
    /// Poll `inner` every `interval` (at least one millisecond).
    pub fn new(inner: Arc<dyn PositionSource>, interval: Duration) -> Self {
        Self {
            inner,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// The polling period.
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl core::fmt::Debug for PollingSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PollingSource")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Run one request under the caller's timeout.
async fn bounded_request(
    source: &dyn PositionSource,
    options: &WatchOptions,
) -> Result<RawSample, SourceError> {
    tokio::time::timeout(options.timeout, source.current(options))
        .await
        .unwrap_or(Err(SourceError::Timeout))
}

impl PositionSource for PollingSource {
    fn watch(&self, options: &WatchOptions) -> SampleStream {
        let inner = Arc::clone(&self.inner);
        let period = self.interval;
        let options = *options;
        // The interval timer needs a runtime, so it is created on first poll.
        stream::unfold(None, move |ticker: Option<tokio::time::Interval>| {
            let inner = Arc::clone(&inner);
            async move {
                let mut ticker = ticker.unwrap_or_else(|| {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                    ticker
                });
                ticker.tick().await;
                let item = bounded_request(inner.as_ref(), &options).await;
                Some((item, Some(ticker)))
            }
        })
        .boxed()
    }

    fn current(&self, options: &WatchOptions) -> OneShot {
        let inner = Arc::clone(&self.inner);
        let options = *options;
        Box::pin(async move { bounded_request(inner.as_ref(), &options).await })
    }
}
