use super::RemoteStore;
use crate::error::{NotesError, Result};
use crate::store::local::write_atomic;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Clone)]
struct Object {
    bytes: Vec<u8>,
    modified: DateTime<Utc>,
}

/// In-memory remote for tests.
///
/// Uses a `Mutex` rather than `RefCell` because the store requires
/// `Send + Sync` remotes.
#[derive(Default)]
pub struct MemRemote {
    objects: Mutex<HashMap<String, Object>>,
    offline: AtomicBool,
    stats: AtomicUsize,
    downloads: AtomicUsize,
    uploads: AtomicUsize,
}

impl MemRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object with an explicit timestamp.
    pub fn put(&self, path: &str, bytes: impl Into<Vec<u8>>, modified: DateTime<Utc>) {
        self.lock().insert(
            path.to_string(),
            Object {
                bytes: bytes.into(),
                modified,
            },
        );
    }

    /// Make every call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().get(path).map(|o| o.bytes.clone())
    }

    /// Calls to `modified`, failed ones included.
    pub fn stats(&self) -> usize {
        self.stats.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Object>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(NotesError::Remote("simulated network failure".to_string()));
        }
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Object> {
        self.lock()
            .get(path)
            .cloned()
            .ok_or_else(|| NotesError::Remote(format!("not_found: {}", path)))
    }
}

impl RemoteStore for MemRemote {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn modified(&self, path: &str) -> Result<DateTime<Utc>> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.get(path)?.modified)
    }

    fn download(&self, path: &str, local: &Path) -> Result<()> {
        self.check_online()?;
        let object = self.get(path)?;
        write_atomic(local, &object.bytes)?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn upload(&self, local: &Path, path: &str) -> Result<()> {
        self.check_online()?;
        let bytes = fs::read(local)?;
        self.put(path, bytes, Utc::now());
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
