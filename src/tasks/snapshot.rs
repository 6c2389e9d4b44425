//! Periodic Snapshot Task

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::store::Database;

/// Spawns a task that dumps every table to `dir` each `interval_secs`.
///
/// Dumps run on the blocking pool. Returns `None` when the interval is 0.
pub fn spawn_snapshot_task(
    db: Arc<Database>,
    dir: PathBuf,
    interval_secs: u64,
) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        info!("Periodic snapshots disabled");
        return None;
    }
    let interval = Duration::from_secs(interval_secs);

    Some(tokio::spawn(async move {
        info!(
            "Starting snapshot task with interval of {} seconds into {}",
            interval_secs,
            dir.display()
        );

        loop {
            tokio::time::sleep(interval).await;

            let db = db.clone();
            let dir = dir.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || db.dump_all(&dir)).await {
                error!("Snapshot task failed: {}", e);
            }
        }
    }))
}
