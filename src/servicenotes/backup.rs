//! # Backups
//!
//! A backup is a plain copy of the notes file, named
//! `<prefix><YYYYmmdd_HHMMSS>.json` and kept next to it (or in the configured
//! backup directory). Backups are never pruned.
//!
//! Timestamps have one-second resolution, so two snapshots taken within the
//! same second share a name and the later one wins.
//!
//! The binary holds a [`BackupGuard`] for its whole lifetime; dropping it
//! takes the shutdown snapshot. Drop runs on normal return, on error return
//! and while unwinding from a panic.

use crate::error::{NotesError, Result};
use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const EXTENSION: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub taken_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    source: PathBuf,
    dir: PathBuf,
    prefix: String,
}

impl BackupManager {
    pub fn new(source: impl Into<PathBuf>, dir: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            source: source.into(),
            dir: dir.into(),
            prefix: prefix.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name_for(&self, at: NaiveDateTime) -> String {
        format!("{}{}{}", self.prefix, at.format(TIMESTAMP_FORMAT), EXTENSION)
    }

    /// Copy the notes file to a new timestamped backup.
    pub fn snapshot(&self) -> Result<PathBuf> {
        self.snapshot_at(Local::now().naive_local())
    }

    pub fn snapshot_at(&self, at: NaiveDateTime) -> Result<PathBuf> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        let target = self.dir.join(self.file_name_for(at));
        fs::copy(&self.source, &target)?;
        Ok(target)
    }

    /// Existing backups, newest first.
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(taken_at) = self.parse_name(&path) {
                entries.push(BackupEntry { path, taken_at });
            }
        }
        entries.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
        Ok(entries)
    }

    /// Accepts a bare file name from `list()` or a path to any file.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let in_dir = self.dir.join(name);
        if in_dir.is_file() {
            return Ok(in_dir);
        }
        let as_path = PathBuf::from(name);
        if as_path.is_file() {
            return Ok(as_path);
        }
        Err(NotesError::BackupNotFound(name.to_string()))
    }

    /// Hand the manager to a guard that snapshots when dropped.
    pub fn guard(self) -> BackupGuard {
        BackupGuard { manager: self }
    }

    fn parse_name(&self, path: &Path) -> Option<NaiveDateTime> {
        let name = path.file_name()?.to_str()?;
        let stamp = name.strip_prefix(&self.prefix)?.strip_suffix(EXTENSION)?;
        NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
    }
}

/// Takes exactly one snapshot when it goes out of scope.
pub struct BackupGuard {
    manager: BackupManager,
}

impl Drop for BackupGuard {
    fn drop(&mut self) {
        if !self.manager.source.exists() {
            warn!(
                source = %self.manager.source.display(),
                "no notes file to copy, shutdown backup skipped"
            );
            return;
        }
        match self.manager.snapshot() {
            Ok(path) => info!(backup = %path.display(), "shutdown backup written"),
            Err(e) => error!(
                source = %self.manager.source.display(),
                error = %e,
                "shutdown backup failed"
            ),
        }
    }
}
