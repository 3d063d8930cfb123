//! Crossing tracker, location stream driver, and orchestration for the
//! geofence monitoring engine.
//!
//! For every sample a subject's position source produces, this crate runs
//! one evaluation cycle: normalize the sample, evaluate it against the
//! current area snapshot, diff the result against the subject's previous
//! inside-set, and hand the entered/exited areas to an event sink.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `geofence-config.yaml` into
//!   strongly-typed structs.
//! - [`driver`] -- [`LocationDriver`] running one subject's stream on a
//!   tokio task, and the one-shot [`get_once`].
//! - [`error`] -- [`MonitorError`] taxonomy.
//! - [`hub`] -- [`MonitorHub`] owning one driver per subject.
//! - [`pipeline`] -- The synchronous normalize/evaluate/diff cycle.
//! - [`sample`] -- Raw sample normalization.
//! - [`sink`] -- [`EventSink`] trait and the provided sinks.
//! - [`source`] -- [`PositionSource`] trait, [`BroadcastSource`], and
//!   [`PollingSource`].
//! - [`supply`] -- Area suppliers and periodic registry refresh.
//! - [`tracker`] -- Per-subject crossing state machine.
//!
//! [`LocationDriver`]: driver::LocationDriver
//! [`get_once`]: driver::get_once
//! [`MonitorError`]: error::MonitorError
//! [`MonitorHub`]: hub::MonitorHub
//! [`EventSink`]: sink::EventSink
//! [`PositionSource`]: source::PositionSource
//! [`BroadcastSource`]: source::BroadcastSource
//! [`PollingSource`]: source::PollingSource

pub mod config;
pub mod driver;
pub mod error;
pub mod hub;
pub mod pipeline;
pub mod sample;
pub mod sink;
pub mod source;
pub mod supply;
pub mod tracker;

pub use config::{ConfigError, MonitorConfig};
pub use driver::{DriverOptions, LocationDriver, get_once};
pub use error::MonitorError;
pub use hub::MonitorHub;
pub use pipeline::MonitorPipeline;
pub use sample::normalize;
pub use sink::{ChannelSink, EventSink, FnSink, MonitorEvent, NoOpSink};
pub use source::{
    BroadcastSource, OneShot, PollingSource, PositionSource, SampleStream, SourceError,
    WatchOptions,
};
pub use supply::{
    AreaSupplier, FileAreas, RefreshHandle, StaticAreas, SupplyError, refresh_once,
    spawn_refresh,
};
pub use tracker::{CrossingTracker, Crossings};
