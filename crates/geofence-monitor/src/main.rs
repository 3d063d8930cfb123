//! Geofence monitor binary.
//!
//! Loads the area list, replays every configured recorded track as its own
//! subject, and logs each boundary crossing until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `geofence-config.yaml` (or `$GEOFENCE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Load the area list and install it in the registry
//! 4. Start periodic area refresh if configured
//! 5. Start one location stream per track
//! 6. Wait for Ctrl-C, then stop every stream

mod error;
mod log_sink;
mod replay;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use geofence_core::config::LoggingConfig;
use geofence_core::{FileAreas, MonitorConfig, MonitorHub, refresh_once, spawn_refresh};
use geofence_geo::AreaRegistry;
use geofence_types::SubjectId;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;
use crate::log_sink::LogSink;
use crate::replay::ReplaySource;

/// Environment variable naming the configuration file.
const ENV_CONFIG_PATH: &str = "GEOFENCE_CONFIG";

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "geofence-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the initial area load, or starting a
/// track fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_tracing(&config.logging);

    info!("geofence-monitor starting");
    run(config).await?;
    info!("geofence-monitor shutdown complete");
    Ok(())
}

async fn run(config: MonitorConfig) -> Result<(), AppError> {
    info!(
        areas_path = %config.areas.path.display(),
        refresh_interval_secs = config.areas.refresh_interval_secs,
        tracks = config.tracks.len(),
        high_accuracy = config.source.high_accuracy,
        timeout_ms = config.source.timeout_ms,
        "Configuration loaded"
    );

    // Initial area load; a failure here is fatal.
    let registry = Arc::new(AreaRegistry::new());
    let supplier = Arc::new(FileAreas::new(config.areas.path.clone()));
    let report = refresh_once(&registry, supplier.as_ref()).await?;
    info!(
        version = report.version,
        accepted = report.accepted,
        duplicates = report.duplicates.len(),
        malformed = report.malformed.len(),
        active = registry.snapshot().active_count(),
        "Areas loaded"
    );

    let refresh = config
        .refresh_interval()
        .map(|interval| spawn_refresh(Arc::clone(&registry), supplier, interval));

    let mut hub = MonitorHub::new(Arc::clone(&registry), config.driver_options());
    for track in &config.tracks {
        let source =
            ReplaySource::from_file(&track.path, Duration::from_millis(track.interval_ms)).await?;
        let subject = SubjectId::new();
        info!(
            subject = %subject,
            track = %track.path.display(),
            samples = source.len(),
            interval_ms = track.interval_ms,
            "Replaying track"
        );
        hub.watch_subject(
            subject,
            Arc::new(source),
            LogSink::new(track.path.display().to_string()),
        )?;
    }
    if hub.is_empty() {
        warn!("No tracks configured, only the area registry is active");
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(|source| AppError::Signal { source })?;
    info!("Shutdown requested");

    hub.stop_all().await;
    if let Some(handle) = refresh {
        handle.stop().await;
    }
    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load configuration from `$GEOFENCE_CONFIG` or `geofence-config.yaml`.
///
/// A missing file means defaults (with environment overrides applied).
fn load_config() -> Result<MonitorConfig, AppError> {
    let path = std::env::var(ENV_CONFIG_PATH)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        Ok(MonitorConfig::from_file(&path)?)
    } else {
        let mut config = MonitorConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}
