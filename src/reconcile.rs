//! The reconciliation orchestrator.
//!
//! Three ordered phases per invocation: Load, Reconcile, Persist. The
//! orchestrator is the only component with side effects; it sequences the
//! pure diffs, turns their results into [`SqlOp`] descriptors, and hands
//! those to the executor. All Mendeley mutations commit together at the
//! end of a successful run, and the text database is rewritten wholesale.

use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::baseurl::BaseUrl;
use crate::diff;
use crate::error::Result;
use crate::mendeley::MendeleyDb;
use crate::model::DocumentFile;
use crate::ops::{OpExecutor, SqlOp};
use crate::textdb;

/// Run configuration, constructed once and passed in explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Report intended changes without mutating either store.
    pub dry_run: bool,
    /// Resolve name conflicts by overwriting Mendeley with the text
    /// database's name.
    pub force_update: bool,
}

/// Why a text database record was not inserted into Mendeley.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The record's uuid does not resolve to a Mendeley document.
    DocumentNotFound,
    /// A file row for the hash already exists.
    HashExists,
}

/// A skipped text-to-Mendeley addition.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedAddition {
    pub name: String,
    pub reason: SkipReason,
}

/// A hash recorded under different names in the two stores.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    pub hash: String,
    /// Name currently held by Mendeley.
    pub mendeley_name: String,
    /// Name held by the text database.
    pub text_name: String,
}

/// Everything one run decided and did.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    /// The text database did not exist and is being created.
    pub created_text_db: bool,
    /// Records added to the text database from Mendeley.
    pub new_from_mendeley: Vec<DocumentFile>,
    /// Records found only in the text database (including ones later
    /// skipped).
    pub new_from_text: Vec<DocumentFile>,
    /// Text records that could not be inserted into Mendeley.
    pub skipped: Vec<SkippedAddition>,
    /// Unresolved name conflicts; both stores left untouched.
    pub conflicts: Vec<ConflictReport>,
    /// Conflicts resolved by overwriting Mendeley (force mode).
    pub forced_updates: Vec<ConflictReport>,
    /// Full text database content, populated in dry-run mode instead of
    /// writing the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_file_preview: Option<String>,
}

impl SyncReport {
    /// Whether the run changed (or would change) anything anywhere.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.new_from_mendeley.is_empty()
            && self.new_from_text.is_empty()
            && self.forced_updates.is_empty()
    }
}

/// Reconcile the Mendeley database with the text database.
///
/// # Errors
///
/// Fatal errors (malformed text line, SQL failure, I/O failure) abort the
/// run; a malformed line is detected during Load, before anything has been
/// written to either store. Missing documents, duplicate hashes, and name
/// conflicts are recoverable and only produce warnings or report entries.
pub fn run(
    db: &mut MendeleyDb,
    text_db_path: &Path,
    base: &BaseUrl,
    options: SyncOptions,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    // Load. An empty Mendeley result set is a legitimate empty snapshot;
    // a missing text database is the first run.
    let mendeley = db.snapshot(base)?;
    let text = match textdb::load(text_db_path)? {
        Some(snapshot) => snapshot,
        None => {
            report.created_text_db = true;
            crate::model::Snapshot::default()
        }
    };

    // Direction 1: Mendeley -> text. Pure merge, the Mendeley store is
    // never mutated here.
    let mut merged = text.clone();
    for record in diff::new_in(&text, &mendeley) {
        report.new_from_mendeley.push(record.clone());
        merged.insert(record);
    }

    // Direction 2: text -> Mendeley. Decisions here only emit descriptors;
    // execution happens once, at the end.
    let mut ops = Vec::new();
    let mut mendeley_effective = mendeley.clone();
    for record in diff::new_in(&mendeley, &merged) {
        report.new_from_text.push(record.clone());

        let Some(document_id) = db.document_id(&record.uuid)? else {
            warn!(
                file = %record.name,
                uuid = %record.uuid,
                "no Mendeley document for file; synchronise your Mendeley desktop client first"
            );
            report.skipped.push(SkippedAddition {
                name: record.name,
                reason: SkipReason::DocumentNotFound,
            });
            continue;
        };
        if db.hash_exists(&record.hash)? {
            warn!(file = %record.name, hash = %record.hash, "file hash already exists");
            report.skipped.push(SkippedAddition {
                name: record.name,
                reason: SkipReason::HashExists,
            });
            continue;
        }

        ops.push(SqlOp::InsertFile {
            hash: record.hash.clone(),
            local_url: base.to_absolute(&record.name),
        });
        ops.push(SqlOp::LinkFile {
            document_id,
            hash: record.hash.clone(),
        });
        mendeley_effective.insert(record);
    }

    // Conflict pass, against the relational state as it will stand after
    // the planned insertions.
    for conflict in diff::conflicts_between(&mendeley_effective, &merged) {
        let entry = ConflictReport {
            hash: conflict.record.hash.clone(),
            mendeley_name: conflict.current_name,
            text_name: conflict.record.name.clone(),
        };
        if options.force_update {
            ops.push(SqlOp::UpdateFileUrl {
                hash: conflict.record.hash,
                local_url: base.to_absolute(&conflict.record.name),
            });
            report.forced_updates.push(entry);
        } else {
            report.conflicts.push(entry);
        }
    }

    // Persist.
    OpExecutor::new(options.dry_run).run(db, &ops)?;
    if options.dry_run {
        report.text_file_preview = Some(textdb::render(&merged));
    } else {
        textdb::save(text_db_path, &merged)?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixture_db() -> MendeleyDb {
        let db = MendeleyDb::open_memory().unwrap();
        db.conn()
            .execute_batch(
                "CREATE TABLE Documents (
                     id INTEGER PRIMARY KEY,
                     uuid TEXT NOT NULL,
                     citationKey TEXT
                 );
                 CREATE TABLE Files (
                     hash TEXT PRIMARY KEY,
                     localUrl TEXT
                 );
                 CREATE TABLE DocumentFiles (
                     documentId INTEGER NOT NULL,
                     hash TEXT NOT NULL,
                     remoteUrl TEXT,
                     unlinked TEXT,
                     downloadRestricted TEXT
                 );",
            )
            .unwrap();
        db
    }

    fn base() -> BaseUrl {
        BaseUrl::new(std::path::Path::new("/home/u/pdfs")).unwrap()
    }

    fn add_document(db: &MendeleyDb, id: i64, uuid: &str, key: Option<&str>) {
        db.conn()
            .execute(
                "INSERT INTO Documents (id, uuid, citationKey) VALUES (?1, ?2, ?3)",
                (id, uuid, key),
            )
            .unwrap();
    }

    fn add_file(db: &MendeleyDb, document_id: i64, hash: &str, url: &str) {
        db.conn()
            .execute("INSERT INTO Files (hash, localUrl) VALUES (?1, ?2)", (hash, url))
            .unwrap();
        db.conn()
            .execute(
                "INSERT INTO DocumentFiles \
                 (documentId, hash, remoteUrl, unlinked, downloadRestricted) \
                 VALUES (?1, ?2, '', 'false', 'false')",
                (document_id, hash),
            )
            .unwrap();
    }

    fn text_db(dir: &TempDir) -> PathBuf {
        dir.path().join("mendeley_files.dat")
    }

    #[test]
    fn first_run_creates_the_text_database() {
        let dir = TempDir::new().unwrap();
        let path = text_db(&dir);
        let mut db = fixture_db();
        add_document(&db, 1, "D1", Some("Smith2011"));
        add_file(&db, 1, "abc", "file:///home/u/pdfs/smith.pdf");

        let report = run(&mut db, &path, &base(), SyncOptions::default()).unwrap();

        assert!(report.created_text_db);
        assert_eq!(report.new_from_mendeley.len(), 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "D1:::Smith2011:::abc:::smith.pdf\n"
        );
    }

    #[test]
    fn second_run_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = text_db(&dir);
        let mut db = fixture_db();
        add_document(&db, 1, "D1", Some("Smith2011"));
        add_file(&db, 1, "abc", "file:///home/u/pdfs/smith.pdf");

        run(&mut db, &path, &base(), SyncOptions::default()).unwrap();
        let first = fs::read_to_string(&path).unwrap();

        let report = run(&mut db, &path, &base(), SyncOptions::default()).unwrap();
        assert!(report.is_noop());
        assert!(report.conflicts.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn text_record_is_inserted_into_mendeley() {
        let dir = TempDir::new().unwrap();
        let path = text_db(&dir);
        fs::write(
            &path,
            "D1:::Smith2011:::abc:::smith.pdf\nD1:::Smith2011:::def:::smith2.pdf\n",
        )
        .unwrap();
        let mut db = fixture_db();
        add_document(&db, 1, "D1", Some("Smith2011"));
        add_file(&db, 1, "abc", "file:///home/u/pdfs/smith.pdf");

        let report = run(&mut db, &path, &base(), SyncOptions::default()).unwrap();

        assert_eq!(report.new_from_text.len(), 1);
        assert!(report.skipped.is_empty());
        assert!(db.hash_exists("def").unwrap());
        let snapshot = db.snapshot(&base()).unwrap();
        assert_eq!(snapshot.name_of("def"), Some("smith2.pdf"));
        // The text database keeps both lines.
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("abc:::smith.pdf"));
        assert!(content.contains("def:::smith2.pdf"));

        // Re-running must not insert a second time.
        let report = run(&mut db, &path, &base(), SyncOptions::default()).unwrap();
        assert!(report.is_noop());
    }

    #[test]
    fn unresolved_document_is_skipped_with_a_warning() {
        let dir = TempDir::new().unwrap();
        let path = text_db(&dir);
        fs::write(&path, "D9:::Nobody:::zzz:::nobody.pdf\n").unwrap();
        let mut db = fixture_db();

        let report = run(&mut db, &path, &base(), SyncOptions::default()).unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::DocumentNotFound);
        assert!(!db.hash_exists("zzz").unwrap());
        // The record survives in the text database for a later run.
        assert!(fs::read_to_string(&path).unwrap().contains("nobody.pdf"));
    }

    #[test]
    fn existing_hash_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = text_db(&dir);
        fs::write(&path, "D1:::Smith2011:::abc:::elsewhere.pdf\n").unwrap();
        let mut db = fixture_db();
        add_document(&db, 1, "D1", Some("Smith2011"));
        // Hash exists in Files but is not linked through DocumentFiles, so
        // it is absent from the snapshot and survives the new_in diff.
        db.conn()
            .execute(
                "INSERT INTO Files (hash, localUrl) VALUES ('abc', 'file:///home/u/pdfs/smith.pdf')",
                [],
            )
            .unwrap();

        let report = run(&mut db, &path, &base(), SyncOptions::default()).unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::HashExists);
    }

    #[test]
    fn conflict_without_force_touches_neither_store() {
        let dir = TempDir::new().unwrap();
        let path = text_db(&dir);
        fs::write(&path, "D1:::Smith2011:::abc:::renamed.pdf\n").unwrap();
        let mut db = fixture_db();
        add_document(&db, 1, "D1", Some("Smith2011"));
        add_file(&db, 1, "abc", "file:///home/u/pdfs/smith.pdf");

        let report = run(&mut db, &path, &base(), SyncOptions::default()).unwrap();

        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].mendeley_name, "smith.pdf");
        assert_eq!(report.conflicts[0].text_name, "renamed.pdf");
        assert!(report.forced_updates.is_empty());
        // Mendeley keeps its name, the text database keeps its own.
        assert_eq!(db.snapshot(&base()).unwrap().name_of("abc"), Some("smith.pdf"));
        assert!(fs::read_to_string(&path).unwrap().contains("renamed.pdf"));
    }

    #[test]
    fn conflict_with_force_overwrites_mendeley() {
        let dir = TempDir::new().unwrap();
        let path = text_db(&dir);
        fs::write(&path, "D1:::Smith2011:::abc:::renamed.pdf\n").unwrap();
        let mut db = fixture_db();
        add_document(&db, 1, "D1", Some("Smith2011"));
        add_file(&db, 1, "abc", "file:///home/u/pdfs/smith.pdf");

        let options = SyncOptions {
            force_update: true,
            ..SyncOptions::default()
        };
        let report = run(&mut db, &path, &base(), options).unwrap();

        assert!(report.conflicts.is_empty());
        assert_eq!(report.forced_updates.len(), 1);
        assert_eq!(
            db.snapshot(&base()).unwrap().name_of("abc"),
            Some("renamed.pdf")
        );
        // The text value is unchanged.
        assert!(fs::read_to_string(&path).unwrap().contains("renamed.pdf"));
    }

    #[test]
    fn external_references_ride_along_untouched() {
        let dir = TempDir::new().unwrap();
        let path = text_db(&dir);
        fs::write(&path, "D1:::Key:::eee:::https://example.org/x.pdf\n").unwrap();
        let mut db = fixture_db();
        add_document(&db, 1, "D1", Some("Key"));
        add_file(&db, 1, "fff", "file:///mnt/elsewhere/ext.pdf");

        let report = run(&mut db, &path, &base(), SyncOptions::default()).unwrap();

        // Neither external record is proposed in either direction.
        assert!(report.new_from_mendeley.is_empty());
        assert!(report.new_from_text.is_empty());
        assert!(!db.hash_exists("eee").unwrap());
        // The text database still carries its external line.
        assert!(
            fs::read_to_string(&path)
                .unwrap()
                .contains("https://example.org/x.pdf")
        );
    }

    #[test]
    fn dry_run_mutates_nothing_anywhere() {
        let dir = TempDir::new().unwrap();
        let path = text_db(&dir);
        fs::write(&path, "D1:::Smith2011:::def:::smith2.pdf\n").unwrap();
        let mut db = fixture_db();
        add_document(&db, 1, "D1", Some("Smith2011"));
        add_file(&db, 1, "abc", "file:///home/u/pdfs/smith.pdf");

        let options = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };
        let report = run(&mut db, &path, &base(), options).unwrap();

        assert!(!db.hash_exists("def").unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "D1:::Smith2011:::def:::smith2.pdf\n"
        );
        let preview = report.text_file_preview.unwrap();
        assert!(preview.contains("abc:::smith.pdf"));
        assert!(preview.contains("def:::smith2.pdf"));
    }

    #[test]
    fn dry_run_on_first_run_writes_no_file() {
        let dir = TempDir::new().unwrap();
        let path = text_db(&dir);
        let mut db = fixture_db();
        add_document(&db, 1, "D1", Some("Smith2011"));
        add_file(&db, 1, "abc", "file:///home/u/pdfs/smith.pdf");

        let options = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };
        let report = run(&mut db, &path, &base(), options).unwrap();

        assert!(report.created_text_db);
        assert!(!path.exists());
    }

    #[test]
    fn malformed_text_line_aborts_before_any_mutation() {
        let dir = TempDir::new().unwrap();
        let path = text_db(&dir);
        fs::write(&path, "not a valid line\n").unwrap();
        let mut db = fixture_db();
        add_document(&db, 1, "D1", Some("Smith2011"));
        add_file(&db, 1, "abc", "file:///home/u/pdfs/smith.pdf");

        let err = run(&mut db, &path, &base(), SyncOptions::default()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        // Text database untouched.
        assert_eq!(fs::read_to_string(&path).unwrap(), "not a valid line\n");
    }
}
