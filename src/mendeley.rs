//! Mendeley SQLite database access.
//!
//! Three tables are consumed: `Documents` (id, uuid, citationKey), `Files`
//! (hash, localUrl), and the `DocumentFiles` link table. The snapshot is
//! read-only and derived; mutations go through [`MendeleyDb::apply`] as a
//! batch of [`SqlOp`] descriptors committed in one transaction.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use crate::baseurl::BaseUrl;
use crate::error::Result;
use crate::model::{DocumentFile, Snapshot};
use crate::ops::SqlOp;

/// Connection to the Mendeley desktop client's database.
#[derive(Debug)]
pub struct MendeleyDb {
    conn: Connection,
}

impl MendeleyDb {
    /// Open the database at the given path.
    ///
    /// The caller has already checked the file exists; opening applies no
    /// schema, the desktop client owns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// The underlying connection (for read operations and test fixtures).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// All files associated with documents, names translated through the
    /// base URL.
    ///
    /// Rows whose `localUrl` is NULL or empty are skipped: the file is not
    /// stored locally. NULL citation keys become empty strings. Ordered by
    /// hash so duplicate-hash anomalies resolve the same way every run.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn snapshot(&self, base: &BaseUrl) -> Result<Snapshot> {
        let mut stmt = self.conn.prepare(
            "SELECT d.uuid, IFNULL(d.citationKey, ''), f.hash, f.localUrl \
             FROM DocumentFiles df \
             JOIN Documents d ON d.id = df.documentId \
             JOIN Files f ON f.hash = df.hash \
             ORDER BY f.hash",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (uuid, key, hash, local_url) = row?;
            let Some(url) = local_url else { continue };
            if url.is_empty() {
                continue;
            }
            records.push(DocumentFile::new(uuid, key, hash, base.to_relative(&url)));
        }
        Ok(Snapshot::from_records(records))
    }

    /// The primary key for a document, looked up by uuid.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn document_id(&self, uuid: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT id FROM Documents WHERE uuid = ?1", [uuid], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id)
    }

    /// Whether a file row already exists for the hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn hash_exists(&self, hash: &str) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row("SELECT hash FROM Files WHERE hash = ?1", [hash], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// Execute a batch of operations in one IMMEDIATE transaction.
    ///
    /// All mutations of a run commit together; on error nothing is
    /// committed.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement or the commit fails.
    pub fn apply(&mut self, ops: &[SqlOp]) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for op in ops {
            op.execute(&tx)?;
        }
        tx.commit()?;
        Ok(())
    }
}
