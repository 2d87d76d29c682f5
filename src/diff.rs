//! Pure snapshot comparison.
//!
//! No I/O, no mutation: both functions take two snapshots and return owned
//! results, sorted by file name so reports are deterministic. The hash is
//! the only join key; uuid and citation key differences are never
//! inspected.

use crate::model::{DocumentFile, Snapshot};

/// A hash recorded under different names on the two sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameConflict {
    /// The incoming record under consideration (from side `b`).
    pub record: DocumentFile,
    /// The name side `a` currently holds for the same hash.
    pub current_name: String,
}

/// Records in `candidate` whose hash is absent from `reference`.
///
/// External references are dropped: files outside the base directory are
/// never proposed as additions.
#[must_use]
pub fn new_in(reference: &Snapshot, candidate: &Snapshot) -> Vec<DocumentFile> {
    let mut new: Vec<DocumentFile> = candidate
        .iter()
        .filter(|record| !reference.contains_hash(&record.hash) && !record.is_external())
        .cloned()
        .collect();
    new.sort_by(|x, y| x.name.cmp(&y.name));
    new
}

/// Hashes present in both snapshots but recorded under different names.
///
/// Yields `b`'s record together with `a`'s name for the same hash; the
/// caller fixes which side is which. A matched hash with identical names is
/// never reported, whatever the other fields say. Pairs where either side
/// is an external reference are skipped.
#[must_use]
pub fn conflicts_between(a: &Snapshot, b: &Snapshot) -> Vec<NameConflict> {
    let mut conflicts: Vec<NameConflict> = b
        .iter()
        .filter(|record| !record.is_external())
        .filter_map(|record| {
            let current = a.name_of(&record.hash)?;
            if current == record.name || current.contains("://") {
                return None;
            }
            Some(NameConflict {
                record: record.clone(),
                current_name: current.to_string(),
            })
        })
        .collect();
    conflicts.sort_by(|x, y| x.record.name.cmp(&y.record.name));
    conflicts
}
