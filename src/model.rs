//! The document-file record, its text codec, and snapshots.
//!
//! A [`DocumentFile`] ties one file on disk to one Mendeley document. The
//! text database stores one record per line, fields joined by `:::` in the
//! fixed order uuid, key, hash, name.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Field separator used in the text database.
pub const SEPARATOR: &str = ":::";

/// A line that did not split into exactly four fields.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected 4 fields separated by \":::\", found {found}")]
pub struct LineFormatError {
    /// Number of fields the split produced.
    pub found: usize,
}

/// A file associated with a reference document.
///
/// `uuid` and `key` identify the document; several records may share them
/// (one document, many files). `hash` and `name` identify the file; the
/// hash is the sole join key between the Mendeley database and the text
/// database. `name` is either a path relative to the base directory or an
/// absolute URL-scheme reference to a file outside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFile {
    pub uuid: String,
    pub key: String,
    pub hash: String,
    pub name: String,
}

impl DocumentFile {
    /// Build a record from explicit fields.
    #[must_use]
    pub fn new(
        uuid: impl Into<String>,
        key: impl Into<String>,
        hash: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            key: key.into(),
            hash: hash.into(),
            name: name.into(),
        }
    }

    /// Parse a record from its text database line.
    ///
    /// Field values must not themselves contain `:::`; this is a documented
    /// limitation of the format, not a validated invariant.
    ///
    /// # Errors
    ///
    /// Returns [`LineFormatError`] when the split does not yield exactly
    /// four fields.
    pub fn from_line(line: &str) -> Result<Self, LineFormatError> {
        let fields: Vec<&str> = line.split(SEPARATOR).collect();
        match fields.as_slice() {
            [uuid, key, hash, name] => Ok(Self::new(*uuid, *key, *hash, *name)),
            _ => Err(LineFormatError {
                found: fields.len(),
            }),
        }
    }

    /// Serialize the record as a text database line, without the
    /// terminating newline (the writer adds it).
    #[must_use]
    pub fn to_line(&self) -> String {
        [
            self.uuid.as_str(),
            self.key.as_str(),
            self.hash.as_str(),
            self.name.as_str(),
        ]
        .join(SEPARATOR)
    }

    /// Whether the name points outside the base directory.
    ///
    /// Relative names have had the base URL stripped; anything still
    /// carrying a URL scheme is an external reference and is never a
    /// candidate for addition or conflict detection.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.name.contains("://")
    }

    /// Ordering key for the text database: the citation key,
    /// case-insensitively, falling back to the file name when the key is
    /// empty. The hash breaks ties so output order is total.
    #[must_use]
    pub fn sort_key(&self) -> (String, String) {
        let primary = if self.key.is_empty() {
            self.name.to_lowercase()
        } else {
            self.key.to_lowercase()
        };
        (primary, self.hash.clone())
    }
}

/// The set of records read from one store at one instant, keyed by hash.
///
/// Snapshots are not mutated once loaded; reconciliation builds a new
/// merged snapshot from clones instead.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    records: HashMap<String, DocumentFile>,
}

impl Snapshot {
    /// Build a snapshot from records.
    ///
    /// A hash should appear at most once per snapshot. Duplicates are an
    /// anomaly in the source store: the first record wins and each later
    /// one is dropped with a warning rather than silently overwriting.
    pub fn from_records(records: impl IntoIterator<Item = DocumentFile>) -> Self {
        let mut snapshot = Self::default();
        for record in records {
            snapshot.insert(record);
        }
        snapshot
    }

    /// Add a record, keeping the existing one on a hash collision.
    pub fn insert(&mut self, record: DocumentFile) {
        if let Some(existing) = self.records.get(&record.hash) {
            warn!(
                hash = %record.hash,
                kept = %existing.name,
                dropped = %record.name,
                "duplicate hash in snapshot; keeping the first record"
            );
            return;
        }
        self.records.insert(record.hash.clone(), record);
    }

    #[must_use]
    pub fn contains_hash(&self, hash: &str) -> bool {
        self.records.contains_key(hash)
    }

    /// The name recorded for a hash, if present.
    #[must_use]
    pub fn name_of(&self, hash: &str) -> Option<&str> {
        self.records.get(hash).map(|r| r.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentFile> {
        self.records.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
