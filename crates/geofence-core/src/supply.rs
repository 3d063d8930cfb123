//! Area suppliers and periodic registry refresh.
//!
//! An [`AreaSupplier`] produces the full area list on demand. The registry
//! itself never fetches anything: [`refresh_once`] and [`spawn_refresh`]
//! pull from a supplier and hand the result to
//! [`AreaRegistry::replace_all`].
//!
//! [`FileAreas`] reads a YAML or JSON file. The document is either a list of
//! areas or a mapping with an `areas` key holding that list. Entries are
//! decoded one by one so a single bad entry is logged and skipped instead of
//! discarding the whole list.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use geofence_geo::{AreaRegistry, ReplaceReport};
use geofence_types::Area;
use serde_yml::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors raised while loading an area list.
#[derive(Debug, thiserror::Error)]
pub enum SupplyError {
    /// The area file could not be read.
    #[error("failed to read area file {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The area file is not valid YAML or JSON.
    #[error("failed to parse area file {path}: {source}")]
    Decode {
        /// File that was being parsed.
        path: PathBuf,
        /// The underlying parse error.
        source: serde_yml::Error,
    },

    /// The document parsed but does not hold a list of areas.
    #[error("area file {path} does not contain an area list")]
    NotAList {
        /// File that was being parsed.
        path: PathBuf,
    },
}

/// Produces the complete area list.
pub trait AreaSupplier: Send + Sync {
    /// Load the current area list.
    fn load(&self) -> BoxFuture<'_, Result<Vec<Area>, SupplyError>>;
}

/// A fixed, in-memory area list.
#[derive(Debug, Clone, Default)]
pub struct StaticAreas {
    areas: Vec<Area>,
}

impl StaticAreas {
    /// Supply `areas` on every load.
    pub const fn new(areas: Vec<Area>) -> Self {
        Self { areas }
    }
}

impl AreaSupplier for StaticAreas {
    fn load(&self) -> BoxFuture<'_, Result<Vec<Area>, SupplyError>> {
        Box::pin(async move { Ok(self.areas.clone()) })
    }
}

/// Area list read from a YAML or JSON file on every load.
#[derive(Debug, Clone)]
pub struct FileAreas {
    path: PathBuf,
}

impl FileAreas {
    /// Read areas from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AreaSupplier for FileAreas {
    fn load(&self) -> BoxFuture<'_, Result<Vec<Area>, SupplyError>> {
        Box::pin(async move {
            let contents = tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| SupplyError::Io {
                    path: self.path.clone(),
                    source,
                })?;
            parse_areas(&self.path, &contents)
        })
    }
}

/// Decode an area document, skipping entries that do not decode.
///
/// # Errors
///
/// Returns [`SupplyError::Decode`] if the text is not YAML/JSON and
/// [`SupplyError::NotAList`] if it holds no area list.
pub fn parse_areas(path: &Path, contents: &str) -> Result<Vec<Area>, SupplyError> {
    let document: Value = serde_yml::from_str(contents).map_err(|source| SupplyError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let entries = match document {
        Value::Sequence(entries) => entries,
        Value::Mapping(mut mapping) => match mapping.remove("areas") {
            Some(Value::Sequence(entries)) => entries,
            _ => {
                return Err(SupplyError::NotAList {
                    path: path.to_path_buf(),
                });
            }
        },
        // An empty file means an empty list.
        Value::Null => Vec::new(),
        _ => {
            return Err(SupplyError::NotAList {
                path: path.to_path_buf(),
            });
        }
    };

    let total = entries.len();
    let areas: Vec<Area> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_yml::from_value::<Area>(entry) {
            Ok(area) => Some(area),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    index,
                    error = %error,
                    "Skipping undecodable area entry"
                );
                None
            }
        })
        .collect();

    debug!(path = %path.display(), total, decoded = areas.len(), "Area file parsed");
    Ok(areas)
}

/// Load from `supplier` once and replace the registry contents.
///
/// On failure the registry keeps its current snapshot.
pub async fn refresh_once(
    registry: &AreaRegistry,
    supplier: &dyn AreaSupplier,
) -> Result<ReplaceReport, SupplyError> {
    let areas = supplier.load().await?;
    Ok(registry.replace_all(areas))
}

/// Handle on a background refresh task.
///
/// Dropping the handle also ends the task.
#[derive(Debug)]
pub struct RefreshHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop refreshing and wait for the task to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(error) = self.task.await
            && error.is_panic()
        {
            warn!("Area refresh task panicked");
        }
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Reload the registry from `supplier` every `interval`.
///
/// The first reload happens one interval after the call; load the initial
/// list with [`refresh_once`]. Failed loads are logged and leave the
/// previous snapshot in place. Must be called within a tokio runtime.
pub fn spawn_refresh(
    registry: Arc<AreaRegistry>,
    supplier: Arc<dyn AreaSupplier>,
    interval: Duration,
) -> RefreshHandle {
    let period = interval.max(Duration::from_millis(1));
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let start = tokio::time::Instant::now()
            .checked_add(period)
            .unwrap_or_else(tokio::time::Instant::now);
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
            "Area refresh started"
        );
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    match refresh_once(&registry, supplier.as_ref()).await {
                        Ok(report) => debug!(
                            version = report.version,
                            accepted = report.accepted,
                            "Area refresh applied"
                        ),
                        Err(error) => {
                            warn!(error = %error, "Area refresh failed, keeping previous areas");
                        }
                    }
                }
            }
        }
        info!("Area refresh stopped");
    });

    RefreshHandle {
        shutdown: shutdown_tx,
        task,
    }
}
