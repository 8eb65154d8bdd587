use super::local::{read_collection, LocalFile, SaveReport};
use super::sync::{PullOutcome, PushOutcome, SyncHealth, Synchronizer};
use crate::backup::BackupManager;
use crate::error::{NotesError, Result};
use crate::model::{Record, RecordFields, Summary};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

/// Outcome of a mutation.
///
/// `persisted` is false when the local write failed; the change may not
/// have reached disk and the collaborator should say so. `upload` is the
/// push that followed a successful write, `None` without a remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub index: usize,
    pub record: Record,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<PushOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Restored {
    pub records: usize,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<PushOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub local_file: PathBuf,
    pub remote: Option<String>,
    pub records: usize,
    /// What the freshness check run for this status did.
    pub last_pull: Option<PullOutcome>,
    pub health: SyncHealth,
}

/// Façade over the notes file.
///
/// Every operation reloads the collection from disk and, for mutations,
/// writes it back before returning. Nothing is cached between calls. A
/// single lock is held from load to save so concurrent callers in this
/// process cannot lose each other's writes.
///
/// Only [`NotesError::Validation`] and [`NotesError::IndexOutOfRange`] reach
/// the caller from the record operations. Local I/O and remote failures are
/// logged and degrade the result instead:
///
/// - unreadable or corrupt file: treated as an empty collection
/// - failed write: `Receipt::persisted == false`
/// - remote failure: local state is used, [`SyncHealth`] turns degraded
pub struct RecordStore {
    local: LocalFile,
    backups: Option<BackupManager>,
    lock: Mutex<()>,
}

impl RecordStore {
    pub fn new(local: LocalFile) -> Self {
        Self {
            local,
            backups: None,
            lock: Mutex::new(()),
        }
    }

    /// Also snapshot after every successful write.
    pub fn with_backup_after_write(mut self, backups: BackupManager) -> Self {
        self.backups = Some(backups);
        self
    }

    pub fn local_path(&self) -> &Path {
        self.local.path()
    }

    pub fn sync_health(&self) -> SyncHealth {
        self.local
            .sync()
            .map(Synchronizer::health)
            .unwrap_or(SyncHealth::LocalOnly)
    }

    /// All records, after pulling a newer remote copy if there is one.
    pub fn list(&self) -> Vec<Record> {
        let _guard = self.guard();
        self.load_fresh().0
    }

    /// One record, fresh from the remote. Used to prefill edit forms.
    pub fn get(&self, index: usize) -> Result<Record> {
        let _guard = self.guard();
        let (records, _) = self.load_fresh();
        check_index(index, records.len())?;
        Ok(records[index].clone())
    }

    pub fn add(&self, fields: RecordFields) -> Result<Receipt> {
        let record = fields.validate()?;

        let _guard = self.guard();
        let mut records = self.load_or_empty();
        records.push(record.clone());
        let index = records.len() - 1;
        let saved = self.persist(&records);

        info!(index, date = %record.date, theme = %record.theme, "record added");
        Ok(receipt(index, record, saved))
    }

    pub fn update(&self, index: usize, fields: RecordFields) -> Result<Receipt> {
        let _guard = self.guard();
        let mut records = self.load_or_empty();
        check_index(index, records.len())?;
        let record = fields.validate()?;

        records[index] = record.clone();
        let saved = self.persist(&records);

        info!(index, "record updated");
        Ok(receipt(index, record, saved))
    }

    pub fn delete(&self, index: usize) -> Result<Receipt> {
        let _guard = self.guard();
        let mut records = self.load_or_empty();
        if let Err(e) = check_index(index, records.len()) {
            error!(index, len = records.len(), "record not found for deletion");
            return Err(e);
        }

        let record = records.remove(index);
        let saved = self.persist(&records);

        info!(index, "record deleted");
        Ok(receipt(index, record, saved))
    }

    pub fn summarize(&self) -> Summary {
        let _guard = self.guard();
        Summary::from_records(&self.load_or_empty())
    }

    /// Replace the whole collection with the contents of a backup file.
    /// Unlike the record operations, a bad backup is reported to the caller.
    pub fn restore(&self, backup: &Path) -> Result<Restored> {
        let records = read_collection(backup)?;
        for (i, record) in records.iter().enumerate() {
            RecordFields::from(record.clone()).validate().map_err(|e| {
                NotesError::Validation(format!("backup record {} is invalid: {}", i, e))
            })?;
        }

        let _guard = self.guard();
        let saved = self.persist(&records);
        info!(backup = %backup.display(), records = records.len(), "restored from backup");
        Ok(Restored {
            records: records.len(),
            persisted: saved.is_some(),
            upload: saved.and_then(|report| report.upload),
        })
    }

    /// Freshness check plus a record count, for status displays.
    pub fn status(&self) -> StoreStatus {
        let _guard = self.guard();
        let (records, last_pull) = self.load_fresh();
        StoreStatus {
            local_file: self.local.path().to_path_buf(),
            remote: self
                .local
                .sync()
                .map(|s| format!("{}:{}", s.remote_kind(), s.remote_path())),
            records: records.len(),
            last_pull,
            health: self.sync_health(),
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// One freshness check, then a plain read: the check already covers a
    /// missing local file, so the read must not pull again.
    fn load_fresh(&self) -> (Vec<Record>, Option<PullOutcome>) {
        let pulled = self.local.sync().map(Synchronizer::ensure_fresh);
        (self.or_empty(self.local.read()), pulled)
    }

    fn load_or_empty(&self) -> Vec<Record> {
        self.or_empty(self.local.load())
    }

    fn or_empty(&self, loaded: Result<Vec<Record>>) -> Vec<Record> {
        match loaded {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.local.path().display(), error = %e,
                    "could not read notes file, treating as empty");
                Vec::new()
            }
        }
    }

    /// `None` when the local write failed.
    fn persist(&self, records: &[Record]) -> Option<SaveReport> {
        let report = match self.local.save(records) {
            Ok(report) => report,
            Err(e) => {
                error!(path = %self.local.path().display(), error = %e, "could not write notes file");
                return None;
            }
        };
        if let Some(backups) = &self.backups {
            if let Err(e) = backups.snapshot() {
                warn!(error = %e, "backup after write failed");
            }
        }
        Some(report)
    }
}

fn receipt(index: usize, record: Record, saved: Option<SaveReport>) -> Receipt {
    Receipt {
        index,
        record,
        persisted: saved.is_some(),
        upload: saved.and_then(|report| report.upload),
    }
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(NotesError::IndexOutOfRange { index, len });
    }
    Ok(())
}
