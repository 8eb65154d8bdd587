//! # Servicenotes Architecture
//!
//! Servicenotes keeps a small collection of service notes (date, theme,
//! passage, notes, devotional) in one JSON file and mirrors that file to a
//! single remote object. The library owns all behavior; the binary is a thin
//! client over it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Collaborators (cli/ in the binary, server.rs)              │
//! │  - Parse input, format output, map errors to exit/status    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Record Store (store/record_store.rs)                       │
//! │  - list / get / add / update / delete / summarize           │
//! │  - One lock around every load..save                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Local file + Synchronizer (store/local.rs, store/sync.rs)  │
//! │  - Atomic whole-file writes, newer-wins download, upload    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  RemoteStore trait (remote/)                                │
//! │  - Directory, Dropbox, in-memory                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No I/O Assumptions in Core
//!
//! Nothing under the store writes to stdout or exits the process. Failures
//! come back as [`error::NotesError`] values, or are absorbed by the store
//! and reported through `persisted` flags and [`store::SyncHealth`].
//!
//! ## Module Overview
//!
//! - [`model`]: `Record`, `RecordFields` validation, `Summary`
//! - [`store`]: local file, synchronizer, the record store façade
//! - [`remote`]: the remote object trait and its clients
//! - [`backup`]: timestamped snapshots and the shutdown guard
//! - [`config`]: `config.json` and store wiring
//! - [`server`]: JSON over HTTP
//! - [`error`]: error types

pub mod backup;
pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod server;
pub mod store;
