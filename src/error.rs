//! Error types for the synchroniser.
//!
//! Only conditions that abort the run are represented here. Recoverable
//! irregularities (a text record whose document is missing from Mendeley, a
//! hash that already exists, a name conflict) are surfaced as warnings and
//! report entries instead; they never halt the run.
//!
//! Exit codes are category based: 2=database, 4=format, 7=configuration,
//! 8=I/O.

use thiserror::Error;

/// Result type alias for synchroniser operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors. Any of these aborts the run before either store is
/// modified further.
#[derive(Error, Debug)]
pub enum Error {
    /// A required path argument is missing or points at the wrong kind of
    /// filesystem object. Raised before the reconciliation core runs.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A text database line did not split into exactly four fields.
    #[error("Invalid database line {line}: {content}")]
    Format {
        /// Line number (1-indexed).
        line: usize,
        /// The offending line.
        content: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Database(_) => 2,
            Self::Format { .. } => 4,
            Self::Config(_) => 7,
            Self::Io(_) | Self::Json(_) => 8,
        }
    }

    /// Recovery hint for humans.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Format { line, .. } => Some(format!(
                "Each line must contain four fields separated by \":::\". \
                 Neither database was modified; fix or remove line {line} and re-run."
            )),
            Self::Config(_) | Self::Database(_) | Self::Io(_) | Self::Json(_) => None,
        }
    }
}
