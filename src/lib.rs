//! Mendeley file location synchronisation.
//!
//! Keeps two records of "which file belongs to which reference document" in
//! agreement: the Mendeley desktop client's SQLite database and a portable
//! text database that can travel between machines via Unison, Dropbox, or
//! any other file synchroniser.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - The [`model::DocumentFile`] record, its line codec, and snapshots
//! - [`baseurl`] - Base directory to `file:///` URL translation
//! - [`diff`] - Pure snapshot comparison (new records, name conflicts)
//! - [`mendeley`] - Mendeley SQLite database access
//! - [`ops`] - SQL operation descriptors and the dry-run aware executor
//! - [`textdb`] - Flat text database load/save with atomic replacement
//! - [`reconcile`] - The Load / Reconcile / Persist orchestrator
//! - [`error`] - Error types and exit-code mapping

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod baseurl;
pub mod cli;
pub mod diff;
pub mod error;
pub mod mendeley;
pub mod model;
pub mod ops;
pub mod reconcile;
pub mod textdb;

pub use error::{Error, Result};
