use super::RemoteStore;
use crate::error::{NotesError, Result};
use crate::store::local::write_atomic;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Remote backed by a plain directory. Object paths are resolved below
/// `root`; a leading `/` is ignored so the same path works for Dropbox.
pub struct DirRemote {
    root: PathBuf,
}

impl DirRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl RemoteStore for DirRemote {
    fn kind(&self) -> &'static str {
        "directory"
    }

    fn modified(&self, path: &str) -> Result<DateTime<Utc>> {
        let object = self.object_path(path);
        let meta = fs::metadata(&object).map_err(|e| {
            NotesError::Remote(format!("stat {} failed: {}", object.display(), e))
        })?;
        let modified = meta.modified().map_err(|e| {
            NotesError::Remote(format!("no mtime for {}: {}", object.display(), e))
        })?;
        Ok(modified.into())
    }

    fn download(&self, path: &str, local: &Path) -> Result<()> {
        let object = self.object_path(path);
        let bytes = fs::read(&object).map_err(|e| {
            NotesError::Remote(format!("read {} failed: {}", object.display(), e))
        })?;
        write_atomic(local, &bytes)?;
        debug!(from = %object.display(), to = %local.display(), "copied remote object");
        Ok(())
    }

    fn upload(&self, local: &Path, path: &str) -> Result<()> {
        let object = self.object_path(path);
        let bytes = fs::read(local)?;
        write_atomic(&object, &bytes).map_err(|e| {
            NotesError::Remote(format!("write {} failed: {}", object.display(), e))
        })?;
        debug!(from = %local.display(), to = %object.display(), "copied local file to remote");
        Ok(())
    }
}
