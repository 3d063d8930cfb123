//! Error types for the geofence monitor binary.

use std::path::PathBuf;

/// Top-level error for the monitor binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: geofence_core::ConfigError,
    },

    /// The initial area list could not be loaded.
    #[error("area supply error: {source}")]
    Supply {
        /// The underlying supplier error.
        #[from]
        source: geofence_core::SupplyError,
    },

    /// A subject could not be started.
    #[error("monitor error: {source}")]
    Monitor {
        /// The underlying driver error.
        #[from]
        source: geofence_core::MonitorError,
    },

    /// A recorded track could not be read.
    #[error("failed to read track {path}: {source}")]
    Track {
        /// The track file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
