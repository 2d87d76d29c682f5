//! SQL operation descriptors.
//!
//! The reconciliation logic never touches the database directly: it emits
//! [`SqlOp`] values describing each intended mutation, and a separate
//! [`OpExecutor`] either applies them in one transaction or, in dry-run
//! mode, prints them for inspection. This keeps the decision logic pure
//! and independently testable.

use rusqlite::{Transaction, params};

use crate::error::Result;
use crate::mendeley::MendeleyDb;

/// One intended mutation of the Mendeley database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlOp {
    /// Register a file's content hash and absolute location.
    InsertFile { hash: String, local_url: String },
    /// Link an already-registered hash to a document. The remote URL is
    /// left empty and both flags false, matching what the desktop client
    /// writes for a plain local file.
    LinkFile { document_id: i64, hash: String },
    /// Overwrite the recorded location for a hash (forced conflict
    /// resolution).
    UpdateFileUrl { hash: String, local_url: String },
}

impl SqlOp {
    /// Execute the operation inside the given transaction.
    pub(crate) fn execute(&self, tx: &Transaction<'_>) -> rusqlite::Result<()> {
        match self {
            Self::InsertFile { hash, local_url } => {
                tx.execute(
                    "INSERT INTO Files (hash, localUrl) VALUES (?1, ?2)",
                    params![hash, local_url],
                )?;
            }
            Self::LinkFile { document_id, hash } => {
                tx.execute(
                    "INSERT INTO DocumentFiles \
                     (documentId, hash, remoteUrl, unlinked, downloadRestricted) \
                     VALUES (?1, ?2, '', 'false', 'false')",
                    params![document_id, hash],
                )?;
            }
            Self::UpdateFileUrl { hash, local_url } => {
                tx.execute(
                    "UPDATE Files SET localUrl = ?1 WHERE hash = ?2",
                    params![local_url, hash],
                )?;
            }
        }
        Ok(())
    }

    /// The statement with values inlined, as shown in dry-run mode.
    #[must_use]
    pub fn preview(&self) -> String {
        match self {
            Self::InsertFile { hash, local_url } => format!(
                "INSERT INTO Files (hash, localUrl) VALUES (\"{hash}\", \"{local_url}\")"
            ),
            Self::LinkFile { document_id, hash } => format!(
                "INSERT INTO DocumentFiles \
                 (documentId, hash, remoteUrl, unlinked, downloadRestricted) \
                 VALUES (\"{document_id}\", \"{hash}\", '', 'false', 'false')"
            ),
            Self::UpdateFileUrl { hash, local_url } => format!(
                "UPDATE Files SET localUrl = \"{local_url}\" WHERE hash = \"{hash}\""
            ),
        }
    }
}

/// Applies or previews a batch of operations depending on mode.
#[derive(Debug, Clone, Copy)]
pub struct OpExecutor {
    dry_run: bool,
}

impl OpExecutor {
    #[must_use]
    pub const fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Apply all operations in one transaction, or print each statement
    /// without touching the database in dry-run mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is committed in
    /// that case.
    pub fn run(&self, db: &mut MendeleyDb, ops: &[SqlOp]) -> Result<()> {
        if self.dry_run {
            for op in ops {
                println!("Executing: {}", op.preview());
            }
            return Ok(());
        }
        db.apply(ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_preview_inlines_values() {
        let op = SqlOp::InsertFile {
            hash: "abc".into(),
            local_url: "file:///home/u/pdfs/smith.pdf".into(),
        };
        assert_eq!(
            op.preview(),
            "INSERT INTO Files (hash, localUrl) \
             VALUES (\"abc\", \"file:///home/u/pdfs/smith.pdf\")"
        );
    }

    #[test]
    fn link_preview_carries_the_fixed_flags() {
        let op = SqlOp::LinkFile {
            document_id: 42,
            hash: "abc".into(),
        };
        let preview = op.preview();
        assert!(preview.contains("\"42\""));
        assert!(preview.contains("'', 'false', 'false'"));
    }

    #[test]
    fn update_preview_orders_url_before_hash() {
        let op = SqlOp::UpdateFileUrl {
            hash: "abc".into(),
            local_url: "file:///home/u/pdfs/renamed.pdf".into(),
        };
        assert_eq!(
            op.preview(),
            "UPDATE Files SET localUrl = \"file:///home/u/pdfs/renamed.pdf\" \
             WHERE hash = \"abc\""
        );
    }
}
