//! Download retention
//!
//! Deletes downloaded images older than the retention window, leftovers of
//! interrupted downloads, and handle directories left empty. Runs once at
//! startup and then hourly.

use super::instagram::PARTIAL_SUFFIX;
use super::FetchError;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);
/// In-progress downloads older than this were interrupted
const PARTIAL_GRACE: Duration = Duration::from_secs(600);

/// Outcome of one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub files_removed: usize,
    pub dirs_removed: usize,
}

/// Remove images under `root` older than `max_age`
///
/// Expects the `<root>/<handle>/<file>` layout the client writes. A missing
/// root is not an error.
pub async fn sweep_downloads(root: &Path, max_age: Duration) -> Result<SweepStats, FetchError> {
    let mut stats = SweepStats::default();

    let mut handles = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
        Err(e) => return Err(FetchError::Config(format!("Read {} failed: {}", root.display(), e))),
    };

    let now = SystemTime::now();
    while let Some(entry) = next_entry(&mut handles, root).await? {
        let dir = entry.path();
        if !entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }

        let mut files = match tokio::fs::read_dir(&dir).await {
            Ok(files) => files,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable download directory");
                continue;
            }
        };

        let mut remaining = 0;
        while let Some(file) = next_entry(&mut files, &dir).await? {
            let path = file.path();
            let limit = if is_partial(&path) { PARTIAL_GRACE } else { max_age };

            let age = match file.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => now.duration_since(modified).unwrap_or_default(),
                Err(_) => {
                    remaining += 1;
                    continue;
                }
            };

            if age < limit {
                remaining += 1;
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed expired download");
                    stats.files_removed += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove expired download");
                    remaining += 1;
                }
            }
        }

        if remaining == 0 && tokio::fs::remove_dir(&dir).await.is_ok() {
            stats.dirs_removed += 1;
        }
    }

    Ok(stats)
}

async fn next_entry(
    entries: &mut tokio::fs::ReadDir,
    dir: &Path,
) -> Result<Option<tokio::fs::DirEntry>, FetchError> {
    entries
        .next_entry()
        .await
        .map_err(|e| FetchError::Config(format!("Read {} failed: {}", dir.display(), e)))
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(PARTIAL_SUFFIX))
        .unwrap_or(false)
}

/// Sweep `root` now and every hour; `None` when retention is disabled
pub fn spawn_download_sweeper(root: PathBuf, retention_days: u64) -> Option<JoinHandle<()>> {
    if retention_days == 0 {
        info!("Download retention disabled");
        return None;
    }
    let max_age = Duration::from_secs(retention_days.saturating_mul(86_400));

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            match sweep_downloads(&root, max_age).await {
                Ok(stats) if stats.files_removed > 0 => info!(
                    files = stats.files_removed,
                    dirs = stats.dirs_removed,
                    retention_days,
                    "Removed expired downloads"
                ),
                Ok(_) => debug!("No expired downloads"),
                Err(e) => warn!(error = %e, "Download sweep failed"),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_aged(path: &Path, age: Duration) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, [0xFF, 0xD8]).unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let root = TempDir::new().unwrap();
        let day = Duration::from_secs(86_400);

        write_aged(&root.path().join("alice/old.jpg"), day * 8);
        write_aged(&root.path().join("alice/new.jpg"), day);
        write_aged(&root.path().join("bob/old.jpg"), day * 30);

        let stats = sweep_downloads(root.path(), day * 7).await.unwrap();

        assert_eq!(stats.files_removed, 2);
        assert_eq!(stats.dirs_removed, 1);
        assert!(root.path().join("alice/new.jpg").exists());
        assert!(!root.path().join("alice/old.jpg").exists());
        assert!(!root.path().join("bob").exists());
    }

    #[tokio::test]
    async fn test_sweep_clears_interrupted_downloads() {
        let root = TempDir::new().unwrap();
        let stale = root.path().join("alice/.x.jpg.abc.part");
        let fresh = root.path().join("alice/.y.jpg.def.part");
        write_aged(&stale, Duration::from_secs(3600));
        write_aged(&fresh, Duration::from_secs(5));

        let stats = sweep_downloads(root.path(), Duration::from_secs(7 * 86_400)).await.unwrap();

        assert_eq!(stats.files_removed, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn test_sweep_missing_root() {
        let root = TempDir::new().unwrap();
        let stats = sweep_downloads(&root.path().join("nope"), Duration::from_secs(1)).await.unwrap();
        assert_eq!(stats, SweepStats::default());
    }

    #[tokio::test]
    async fn test_sweeper_disabled_at_zero_days() {
        let root = TempDir::new().unwrap();
        assert!(spawn_download_sweeper(root.path().to_path_buf(), 0).is_none());
    }
}
