//! # Storage Layer
//!
//! Records live in a single JSON file on local disk, mirrored to one remote
//! object.
//!
//! ```text
//! RecordStore (record_store.rs)   list/get/add/update/delete/summarize
//!      │
//!      ▼
//! LocalFile (local.rs)            whole-file load/save, atomic writes
//!      │
//!      ▼
//! Synchronizer (sync.rs)          timestamp staleness check, upload
//!      │
//!      ▼
//! RemoteStore (crate::remote)     stat / download / upload
//! ```
//!
//! ## Sync Policy
//!
//! - Reads (`list`, `get`) first ask the [`Synchronizer`] whether the remote
//!   copy is newer. If it is, or if the local file is missing, it is
//!   downloaded over the local file.
//! - Every successful save is followed by an upload. There is no local-only
//!   save mode while a remote is configured.
//! - A remote that cannot be reached never blocks an operation: the local
//!   file is used as-is and [`SyncHealth`] records the degradation.
//!
//! ## Positional Addressing
//!
//! Records are addressed by their zero-based position. Deleting index `i`
//! shifts every later record down by one, so an index read before a delete
//! may point at a different record afterwards.
//!
//! ## File Format
//!
//! ```text
//! [
//!   {
//!     "date": "01/01/2024",
//!     "theme": "Faith",
//!     "passage": "John 3:16",
//!     "serviceNotes": "...",
//!     "devotional": "..."
//!   }
//! ]
//! ```

pub mod local;
pub mod record_store;
pub mod sync;

pub use local::{LocalFile, SaveReport};
pub use record_store::{Receipt, RecordStore, Restored, StoreStatus};
pub use sync::{PullOutcome, PushOutcome, SyncHealth, Synchronizer};
