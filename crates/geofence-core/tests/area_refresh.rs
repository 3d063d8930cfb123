//! Tests for periodic area refresh.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use geofence_core::{AreaSupplier, StaticAreas, SupplyError, spawn_refresh};
use geofence_geo::AreaRegistry;
use geofence_types::{Area, Point};

/// Succeeds on the first load, fails afterwards.
struct FlakySupplier {
    loads: AtomicUsize,
}

impl AreaSupplier for FlakySupplier {
    fn load(&self) -> BoxFuture<'_, Result<Vec<Area>, SupplyError>> {
        let n = self.loads.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if n == 0 {
                Ok(vec![Area::circle("depot", "Depot", Point::new(1.0, 1.0), 50.0)])
            } else {
                Err(SupplyError::NotAList {
                    path: PathBuf::from("areas.yaml"),
                })
            }
        })
    }
}

#[tokio::test(start_paused = true)]
async fn refresh_installs_new_snapshots() {
    let registry = Arc::new(AreaRegistry::new());
    let supplier = Arc::new(StaticAreas::new(vec![Area::circle(
        "a",
        "A",
        Point::new(0.0, 0.0),
        10.0,
    )]));
    let handle = spawn_refresh(Arc::clone(&registry), supplier, Duration::from_secs(10));

    // Nothing happens before the first interval elapses.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(registry.snapshot().version(), 0);

    tokio::time::sleep(Duration::from_secs(6)).await;
    let snapshot = registry.snapshot();
    assert_eq!(snapshot.version(), 1);
    assert_eq!(snapshot.len(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(registry.snapshot().version(), 2);

    handle.stop().await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(registry.snapshot().version(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_previous_areas() {
    let registry = Arc::new(AreaRegistry::new());
    let supplier = Arc::new(FlakySupplier {
        loads: AtomicUsize::new(0),
    });
    let handle = spawn_refresh(
        Arc::clone(&registry),
        Arc::clone(&supplier) as Arc<dyn AreaSupplier>,
        Duration::from_secs(1),
    );

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert!(supplier.loads.load(Ordering::SeqCst) >= 3);

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.version(), 1);
    assert_eq!(snapshot.areas().first().unwrap().id.as_str(), "depot");

    handle.stop().await;
}
