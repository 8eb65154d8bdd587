use crate::remote::RemoteStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Result of a freshness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum PullOutcome {
    Downloaded,
    UpToDate,
    /// The remote could not be stat'ed; the local copy stays authoritative.
    RemoteUnavailable(String),
    DownloadFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum PushOutcome {
    Uploaded,
    Failed(String),
}

/// Last known state of the remote mirror, as seen by this process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncHealth {
    /// No remote configured.
    LocalOnly,
    /// Remote configured but not contacted yet.
    Unchecked,
    Synced,
    Degraded { reason: String },
}

impl SyncHealth {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SyncHealth::Degraded { .. })
    }
}

/// Keeps the local notes file in step with one remote object.
///
/// Staleness is decided purely by timestamps: the remote wins only when its
/// last-modified time is strictly newer than the local file's mtime.
pub struct Synchronizer {
    remote: Arc<dyn RemoteStore>,
    remote_path: String,
    local_path: PathBuf,
    health: Mutex<SyncHealth>,
}

impl Synchronizer {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        remote_path: impl Into<String>,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            remote,
            remote_path: remote_path.into(),
            local_path: local_path.into(),
            health: Mutex::new(SyncHealth::Unchecked),
        }
    }

    pub fn remote_kind(&self) -> &'static str {
        self.remote.kind()
    }

    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    pub fn health(&self) -> SyncHealth {
        self.health
            .lock()
            .map(|h| h.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn set_health(&self, health: SyncHealth) {
        match self.health.lock() {
            Ok(mut h) => *h = health,
            Err(poisoned) => *poisoned.into_inner() = health,
        }
    }

    /// Download the remote copy if the local file is missing or older.
    pub fn ensure_fresh(&self) -> PullOutcome {
        let remote_modified = match self.remote.modified(&self.remote_path) {
            Ok(modified) => modified,
            Err(e) => {
                warn!(remote = self.remote.kind(), path = %self.remote_path, error = %e,
                    "remote unavailable, using local copy");
                self.set_health(SyncHealth::Degraded {
                    reason: e.to_string(),
                });
                return PullOutcome::RemoteUnavailable(e.to_string());
            }
        };

        if let Some(local_modified) = local_modified(&self.local_path) {
            if remote_modified <= local_modified {
                debug!(%remote_modified, %local_modified, "local copy is current");
                self.set_health(SyncHealth::Synced);
                return PullOutcome::UpToDate;
            }
        }

        match self.remote.download(&self.remote_path, &self.local_path) {
            Ok(()) => {
                info!(remote = self.remote.kind(), path = %self.remote_path,
                    "pulled newer remote copy");
                self.set_health(SyncHealth::Synced);
                PullOutcome::Downloaded
            }
            Err(e) => {
                warn!(remote = self.remote.kind(), path = %self.remote_path, error = %e,
                    "download failed, using local copy");
                self.set_health(SyncHealth::Degraded {
                    reason: e.to_string(),
                });
                PullOutcome::DownloadFailed(e.to_string())
            }
        }
    }

    /// Upload the local file, overwriting the remote object.
    pub fn push(&self) -> PushOutcome {
        match self.remote.upload(&self.local_path, &self.remote_path) {
            Ok(()) => {
                info!(remote = self.remote.kind(), path = %self.remote_path, "uploaded notes");
                self.set_health(SyncHealth::Synced);
                PushOutcome::Uploaded
            }
            Err(e) => {
                warn!(remote = self.remote.kind(), path = %self.remote_path, error = %e,
                    "upload failed, remote copy is behind");
                self.set_health(SyncHealth::Degraded {
                    reason: e.to_string(),
                });
                PushOutcome::Failed(e.to_string())
            }
        }
    }
}

/// `None` when the file does not exist.
fn local_modified(path: &Path) -> Option<DateTime<Utc>> {
    let meta = fs::metadata(path).ok()?;
    Some(meta.modified().unwrap_or(SystemTime::now()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::MemRemote;
    use chrono::Duration;
    use tempfile::TempDir;

    const REMOTE_PATH: &str = "/notes.json";

    fn setup() -> (TempDir, PathBuf, Arc<MemRemote>, Synchronizer) {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("notes.json");
        let remote = Arc::new(MemRemote::new());
        let sync = Synchronizer::new(remote.clone(), REMOTE_PATH, &local);
        (dir, local, remote, sync)
    }

    #[test]
    fn missing_remote_is_a_no_op() {
        let (_dir, local, remote, sync) = setup();
        fs::write(&local, "[]").unwrap();

        assert!(matches!(sync.ensure_fresh(), PullOutcome::RemoteUnavailable(_)));
        assert_eq!(remote.downloads(), 0);
        assert_eq!(fs::read_to_string(&local).unwrap(), "[]");
        assert!(sync.health().is_degraded());
    }

    #[test]
    fn absent_local_file_downloads_unconditionally() {
        let (_dir, local, remote, sync) = setup();
        let long_ago = Utc::now() - Duration::days(365);
        remote.put(REMOTE_PATH, "[1]", long_ago);

        assert_eq!(sync.ensure_fresh(), PullOutcome::Downloaded);
        assert_eq!(fs::read_to_string(&local).unwrap(), "[1]");
        assert_eq!(sync.health(), SyncHealth::Synced);
    }

    #[test]
    fn newer_remote_overwrites_local() {
        let (_dir, local, remote, sync) = setup();
        fs::write(&local, "old").unwrap();
        remote.put(REMOTE_PATH, "new", Utc::now() + Duration::hours(1));

        assert_eq!(sync.ensure_fresh(), PullOutcome::Downloaded);
        assert_eq!(fs::read_to_string(&local).unwrap(), "new");
    }

    #[test]
    fn older_remote_is_ignored() {
        let (_dir, local, remote, sync) = setup();
        fs::write(&local, "local").unwrap();
        remote.put(REMOTE_PATH, "remote", Utc::now() - Duration::hours(1));

        assert_eq!(sync.ensure_fresh(), PullOutcome::UpToDate);
        assert_eq!(fs::read_to_string(&local).unwrap(), "local");
        assert_eq!(remote.downloads(), 0);
    }

    #[test]
    fn equal_timestamps_are_a_no_op() {
        let (_dir, local, remote, sync) = setup();
        fs::write(&local, "local").unwrap();
        let local_time = local_modified(&local).unwrap();
        remote.put(REMOTE_PATH, "remote", local_time);

        assert_eq!(sync.ensure_fresh(), PullOutcome::UpToDate);
        assert_eq!(fs::read_to_string(&local).unwrap(), "local");
    }

    #[test]
    fn second_check_without_remote_change_does_not_download() {
        let (_dir, _local, remote, sync) = setup();
        remote.put(REMOTE_PATH, "[]", Utc::now() - Duration::minutes(5));

        sync.ensure_fresh();
        sync.ensure_fresh();
        assert_eq!(remote.downloads(), 1);
    }

    #[test]
    fn offline_download_keeps_local_copy() {
        let (_dir, local, remote, sync) = setup();
        fs::write(&local, "local").unwrap();
        remote.put(REMOTE_PATH, "remote", Utc::now() + Duration::hours(1));
        remote.set_offline(true);

        assert!(matches!(sync.ensure_fresh(), PullOutcome::RemoteUnavailable(_)));
        assert_eq!(fs::read_to_string(&local).unwrap(), "local");
    }

    #[test]
    fn push_overwrites_remote() {
        let (_dir, local, remote, sync) = setup();
        remote.put(REMOTE_PATH, "remote", Utc::now() + Duration::hours(1));
        fs::write(&local, "local").unwrap();

        assert_eq!(sync.push(), PushOutcome::Uploaded);
        assert_eq!(remote.content(REMOTE_PATH).unwrap(), b"local".to_vec());
    }

    #[test]
    fn failed_push_degrades_health() {
        let (_dir, local, remote, sync) = setup();
        fs::write(&local, "local").unwrap();
        remote.set_offline(true);

        assert!(matches!(sync.push(), PushOutcome::Failed(_)));
        assert!(sync.health().is_degraded());
        assert_eq!(remote.uploads(), 0);
    }
}
