use super::sync::{PushOutcome, Synchronizer};
use crate::error::{NotesError, Result};
use crate::model::Record;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// What happened to a successful local write on its way to the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// `None` when no remote is configured.
    pub upload: Option<PushOutcome>,
}

/// The notes file on local disk.
///
/// Reads and writes always move the whole collection. When a
/// [`Synchronizer`] is attached, a missing file is fetched from the remote
/// before reading and every successful write is uploaded.
pub struct LocalFile {
    path: PathBuf,
    sync: Option<Synchronizer>,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sync: None,
        }
    }

    pub fn with_sync(mut self, sync: Synchronizer) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync(&self) -> Option<&Synchronizer> {
        self.sync.as_ref()
    }

    /// Read the collection. A missing file is an empty collection; an
    /// unreadable or undecodable one is an error for the caller to handle.
    pub fn load(&self) -> Result<Vec<Record>> {
        if !self.path.exists() {
            if let Some(sync) = &self.sync {
                sync.ensure_fresh();
            }
        }
        self.read()
    }

    /// Like [`LocalFile::load`] but never contacts the remote. For callers
    /// that have just run their own freshness check.
    pub fn read(&self) -> Result<Vec<Record>> {
        match read_collection(&self.path) {
            Err(NotesError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            other => other,
        }
    }

    /// Replace the file with `records`, then upload it.
    pub fn save(&self, records: &[Record]) -> Result<SaveReport> {
        let encoded = encode_collection(records)?;
        write_atomic(&self.path, encoded.as_bytes())?;
        debug!(path = %self.path.display(), records = records.len(), "wrote notes file");

        let upload = self.sync.as_ref().map(Synchronizer::push);
        Ok(SaveReport { upload })
    }
}

/// Decode a notes file (the live file or a backup).
pub fn read_collection(path: &Path) -> Result<Vec<Record>> {
    let content = fs::read_to_string(path)?;
    let records: Vec<Record> = serde_json::from_str(&content)?;
    Ok(records)
}

/// Pretty JSON with a trailing newline. serde_json leaves non-ASCII text
/// unescaped.
pub fn encode_collection(records: &[Record]) -> Result<String> {
    let mut encoded = serde_json::to_string_pretty(records)?;
    encoded.push('\n');
    Ok(encoded)
}

/// Write to a temp file in the target directory, then rename over the
/// target, so readers never see a half-written file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("notes");
    let tmp = dir.join(format!(".{}-{}.tmp", name, Uuid::new_v4()));

    if let Err(e) = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
