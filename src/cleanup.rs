/// Retention sweep over both storage areas.
///
/// Requests write into the same directories while the sweep runs, so a file
/// vanishing between listing and removal is expected and ignored.
use crate::storage::MediaStore;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub scanned: usize,
    pub removed: usize,
}

pub fn sweep(store: &MediaStore, retention: Duration) -> CleanupReport {
    sweep_at(store, retention, SystemTime::now())
}

/// Remove every file whose creation time is more than `retention` before `now`.
pub fn sweep_at(store: &MediaStore, retention: Duration, now: SystemTime) -> CleanupReport {
    let mut report = CleanupReport::default();

    for dir in store.dirs() {
        sweep_dir(dir, retention, now, &mut report);
    }

    info!(
        scanned = report.scanned,
        removed = report.removed,
        "cleanup sweep finished"
    );
    report
}

fn sweep_dir(dir: &Path, retention: Duration, now: SystemTime, report: &mut CleanupReport) {
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if !is_not_found(err.io_error()) {
                    warn!(dir = %dir.display(), error = %err, "cannot list entry");
                }
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        report.scanned += 1;

        let Some(created) = entry.metadata().ok().and_then(|m| created_at(&m)) else {
            continue;
        };
        // Timestamps in the future count as fresh
        let Ok(age) = now.duration_since(created) else {
            continue;
        };
        if age <= retention {
            continue;
        }

        match fs::remove_file(entry.path()) {
            Ok(()) => {
                debug!(path = %entry.path().display(), ?age, "removed expired file");
                report.removed += 1;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %entry.path().display(), error = %err, "cannot remove expired file"),
        }
    }
}

/// Creation time where the platform records it, modification time otherwise.
fn created_at(metadata: &fs::Metadata) -> Option<SystemTime> {
    metadata.created().or_else(|_| metadata.modified()).ok()
}

fn is_not_found(err: Option<&io::Error>) -> bool {
    err.is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

/// Run [`sweep`] every `interval` on the blocking pool until the runtime stops.
pub fn spawn_periodic(store: MediaStore, retention: Duration, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let store = store.clone();
            if let Err(err) = tokio::task::spawn_blocking(move || sweep(&store, retention)).await {
                warn!(error = %err, "cleanup task panicked");
            }
        }
    })
}
