//! CLI definitions using clap.

use std::path::PathBuf;

use clap::Parser;

use crate::error::{Error, Result};

/// Synchronise the location of files in the Mendeley database using a
/// relative base path.
///
/// File locations are mirrored into a plain text database that can be
/// carried between machines by Unison, Dropbox, or any other file
/// synchroniser, alongside the PDF files themselves.
#[derive(Parser, Debug)]
#[command(name = "mfs", version, about, long_about = None)]
pub struct Cli {
    /// Path to the Mendeley sqlite database, eg.
    /// "~/.local/share/data/Mendeley Ltd./Mendeley Desktop/you@somewhere.com@www.mendeley.com.sqlite"
    pub mendeley_database: PathBuf,

    /// Path to the text database used to store file locations, eg.
    /// ~/.mendeley_files.dat
    pub text_database: PathBuf,

    /// Directory used to store PDF files
    pub file_path: PathBuf,

    /// Display changes that would be made but don't actually modify either
    /// database
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Replace the file path in Mendeley with the path from the text
    /// database when there is a conflict
    #[arg(short = 'f', long)]
    pub force_update: bool,

    /// Output the sync report as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Reject invalid location arguments before the core runs.
    ///
    /// The text database may be absent; that is the first-run state, not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the Mendeley database is not an
    /// existing file or the base path is not a directory.
    pub fn validate(&self) -> Result<()> {
        if !self.mendeley_database.is_file() {
            return Err(Error::Config(format!(
                "File \"{}\" does not exist",
                self.mendeley_database.display()
            )));
        }
        if !self.file_path.is_dir() {
            return Err(Error::Config(format!(
                "\"{}\" is not a directory",
                self.file_path.display()
            )));
        }
        Ok(())
    }
}
