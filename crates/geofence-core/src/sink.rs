//! Event sinks: where evaluation cycles and errors are delivered.
//!
//! The driver calls the sink from its own task, strictly in sample order,
//! so implementations need `Send` but not `Sync`. Sinks must not block for
//! long: the next sample of the same subject waits until the sink returns.

use geofence_types::{EvaluationCycle, SubjectId};
use tokio::sync::mpsc;

use crate::error::MonitorError;

/// Receiver of per-sample results.
pub trait EventSink: Send {
    /// Called once per valid sample, whether or not anything was crossed.
    fn on_cycle(&mut self, cycle: &EvaluationCycle);

    /// Called for every dropped sample and every source error.
    fn on_error(&mut self, subject: SubjectId, error: &MonitorError);
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn on_cycle(&mut self, cycle: &EvaluationCycle) {
        (**self).on_cycle(cycle);
    }

    fn on_error(&mut self, subject: SubjectId, error: &MonitorError) {
        (**self).on_error(subject, error);
    }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn on_cycle(&mut self, _cycle: &EvaluationCycle) {}

    fn on_error(&mut self, _subject: SubjectId, _error: &MonitorError) {}
}

/// Everything a [`ChannelSink`] forwards.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// One evaluation cycle.
    Cycle(EvaluationCycle),
    /// A dropped sample or a source error.
    Error {
        /// The subject whose stream reported the error.
        subject: SubjectId,
        /// What went wrong.
        error: MonitorError,
    },
}

/// Forwards events over an unbounded tokio channel.
///
/// Sending never blocks the driver. Events sent after the receiver is
/// dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<MonitorEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that observes it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Wrap an existing sender, e.g. one shared by several subjects.
    pub const fn from_sender(sender: mpsc::UnboundedSender<MonitorEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn on_cycle(&mut self, cycle: &EvaluationCycle) {
        let _ = self.sender.send(MonitorEvent::Cycle(cycle.clone()));
    }

    fn on_error(&mut self, subject: SubjectId, error: &MonitorError) {
        let _ = self.sender.send(MonitorEvent::Error {
            subject,
            error: error.clone(),
        });
    }
}

/// Adapter for a pair of closures.
pub struct FnSink<C, E> {
    on_cycle: C,
    on_error: E,
}

impl<C, E> FnSink<C, E>
where
    C: FnMut(&EvaluationCycle) + Send,
    E: FnMut(SubjectId, &MonitorError) + Send,
{
    /// Build a sink from a cycle callback and an error callback.
    pub const fn new(on_cycle: C, on_error: E) -> Self {
        Self { on_cycle, on_error }
    }
}

impl<C, E> core::fmt::Debug for FnSink<C, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnSink").finish_non_exhaustive()
    }
}

impl<C, E> EventSink for FnSink<C, E>
where
    C: FnMut(&EvaluationCycle) + Send,
    E: FnMut(SubjectId, &MonitorError) + Send,
{
    fn on_cycle(&mut self, cycle: &EvaluationCycle) {
        (self.on_cycle)(cycle);
    }

    fn on_error(&mut self, subject: SubjectId, error: &MonitorError) {
        (self.on_error)(subject, error);
    }
}
