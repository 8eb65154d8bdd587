use crate::backup::BackupManager;
use crate::error::{NotesError, Result};
use crate::remote::dir::DirRemote;
use crate::remote::dropbox::DropboxRemote;
use crate::remote::RemoteStore;
use crate::store::{LocalFile, RecordStore, Synchronizer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_DATA_FILE: &str = "service_notes.json";
const DEFAULT_BACKUP_PREFIX: &str = "service_notes_backup_";

/// Overrides the data directory.
pub const HOME_ENV: &str = "SERVICENOTES_HOME";
/// Dropbox access token, used when the config file does not carry one.
pub const TOKEN_ENV: &str = "SERVICENOTES_DROPBOX_TOKEN";

/// Where the remote copy lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RemoteConfig {
    #[default]
    None,
    Directory {
        root: PathBuf,
        path: String,
    },
    Dropbox {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
}

/// Configuration, stored in `<home>/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotesConfig {
    /// Notes file; relative paths are resolved against the home directory.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Defaults to the directory holding the notes file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,

    #[serde(default = "default_backup_prefix")]
    pub backup_prefix: String,

    #[serde(default)]
    pub backup_after_write: bool,

    #[serde(default)]
    pub remote: RemoteConfig,
}

fn default_data_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}

fn default_backup_prefix() -> String {
    DEFAULT_BACKUP_PREFIX.to_string()
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            backup_dir: None,
            backup_prefix: default_backup_prefix(),
            backup_after_write: false,
            remote: RemoteConfig::None,
        }
    }
}

impl NotesConfig {
    /// Load `config.json` from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        serde_json::from_str(&content)
            .map_err(|e| NotesError::Config(format!("{}: {}", config_path.display(), e)))
    }

    pub fn data_path(&self, home: &Path) -> PathBuf {
        resolve(home, &self.data_file)
    }

    pub fn backup_dir(&self, home: &Path) -> PathBuf {
        match &self.backup_dir {
            Some(dir) => resolve(home, dir),
            None => self
                .data_path(home)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| home.to_path_buf()),
        }
    }

    pub fn backup_manager(&self, home: &Path) -> BackupManager {
        BackupManager::new(
            self.data_path(home),
            self.backup_dir(home),
            &self.backup_prefix,
        )
    }

    /// Build the remote client and the object path it serves.
    ///
    /// `env_token` is consulted when a Dropbox remote has no token in the
    /// file. A Dropbox remote with no token at all is logged and skipped so
    /// the store still works locally.
    pub fn build_remote(
        &self,
        home: &Path,
        env_token: Option<String>,
    ) -> Option<(Arc<dyn RemoteStore>, String)> {
        match &self.remote {
            RemoteConfig::None => None,
            RemoteConfig::Directory { root, path } => {
                let remote: Arc<dyn RemoteStore> = Arc::new(DirRemote::new(resolve(home, root)));
                Some((remote, path.clone()))
            }
            RemoteConfig::Dropbox { path, token } => {
                match token.clone().or(env_token).filter(|t| !t.trim().is_empty()) {
                    Some(token) => {
                        let remote: Arc<dyn RemoteStore> = Arc::new(DropboxRemote::new(token));
                        Some((remote, path.clone()))
                    }
                    None => {
                        warn!(
                            "dropbox remote configured without a token (set {}), running local-only",
                            TOKEN_ENV
                        );
                        None
                    }
                }
            }
        }
    }

    /// Wire a [`RecordStore`] from this configuration.
    pub fn open_store(&self, home: &Path, env_token: Option<String>) -> RecordStore {
        let data_path = self.data_path(home);
        let mut local = LocalFile::new(&data_path);
        if let Some((remote, remote_path)) = self.build_remote(home, env_token) {
            local = local.with_sync(Synchronizer::new(remote, remote_path, &data_path));
        }

        let store = RecordStore::new(local);
        if self.backup_after_write {
            store.with_backup_after_write(self.backup_manager(home))
        } else {
            store
        }
    }
}

fn resolve(home: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}
