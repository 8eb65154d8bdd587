//! # Remote Storage
//!
//! The remote copy of the notes file lives behind the [`RemoteStore`] trait.
//! The store never talks to a concrete client; the client is built once at
//! startup (see [`crate::config`]) and handed to the store as an
//! `Arc<dyn RemoteStore>`.
//!
//! ## Contract
//!
//! - One object per path. No listing, no partial reads.
//! - `upload` overwrites unconditionally. There is no concurrency token.
//! - `download` replaces the local file atomically.
//! - Every failure (missing object, auth, network) comes back as
//!   [`NotesError::Remote`](crate::error::NotesError::Remote); callers decide
//!   how to degrade.
//!
//! ## Implementations
//!
//! - [`dir::DirRemote`]: a directory standing in for the cloud account, such
//!   as a mounted sync folder.
//! - [`dropbox::DropboxRemote`]: Dropbox HTTP API with a bearer token.
//! - `memory::MemRemote`: in-memory double, built for tests and behind the
//!   `test_utils` feature.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

pub mod dir;
pub mod dropbox;
#[cfg(any(test, feature = "test_utils"))]
pub mod memory;

pub trait RemoteStore: Send + Sync {
    /// Short label used in logs and status output.
    fn kind(&self) -> &'static str;

    /// Last-modified timestamp of the remote object.
    fn modified(&self, path: &str) -> Result<DateTime<Utc>>;

    /// Fetch the remote object into `local`, replacing it.
    fn download(&self, path: &str, local: &Path) -> Result<()>;

    /// Push `local` to the remote object, replacing it.
    fn upload(&self, local: &Path, path: &str) -> Result<()>;
}
