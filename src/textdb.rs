//! The flat text database.
//!
//! UTF-8, one record per line, read fully at the start of a run and
//! rewritten wholesale at the end. Writes go to a temporary sibling which
//! is synced and atomically renamed into place, so a crash mid-write never
//! leaves a truncated file for the next run to read.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::{DocumentFile, Snapshot};

/// Read the text database.
///
/// Returns `None` if the file does not exist yet; the first run creates it.
///
/// # Errors
///
/// Returns [`Error::Format`] on the first line that does not split into
/// exactly four fields, and an I/O error if the file cannot be read. A
/// malformed line is fatal: the caller aborts before any store is touched.
pub fn load(path: &Path) -> Result<Option<Snapshot>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        let record = DocumentFile::from_line(line).map_err(|_| Error::Format {
            line: index + 1,
            content: line.to_string(),
        })?;
        records.push(record);
    }

    Ok(Some(Snapshot::from_records(records)))
}

/// Render a snapshot as the full file content: one line per record,
/// newline-terminated, sorted by [`DocumentFile::sort_key`].
#[must_use]
pub fn render(snapshot: &Snapshot) -> String {
    let mut records: Vec<&DocumentFile> = snapshot.iter().collect();
    records.sort_by_key(|record| record.sort_key());

    let mut content = String::new();
    for record in records {
        content.push_str(&record.to_line());
        content.push('\n');
    }
    content
}

/// Replace the text database with the given snapshot.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written, synced, or
/// renamed; the previous content stays intact in that case.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    atomic_write(path, &render(snapshot))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write content to a file atomically: temp sibling, fsync, rename.
fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let temp_path = temp_sibling(path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        // Sync to disk before rename
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}
