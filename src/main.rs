//! Mendeley file sync entry point.

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use mfs::baseurl::BaseUrl;
use mfs::cli::Cli;
use mfs::error::Error;
use mfs::mendeley::MendeleyDb;
use mfs::reconcile::{self, SyncOptions, SyncReport};

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(report) => {
            if let Err(e) = print_report(&report, &cli) {
                eprintln!("Error: {e}");
                return ExitCode::from(e.exit_code());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if cli.json {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": {
                            "message": e.to_string(),
                            "exit_code": e.exit_code(),
                        }
                    })
                );
            } else if let Some(hint) = e.hint() {
                eprintln!("Error: {e}\n  Hint: {hint}");
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<SyncReport, Error> {
    cli.validate()?;

    let base = BaseUrl::new(&cli.file_path)?;
    let mut db = MendeleyDb::open(&cli.mendeley_database)?;
    let options = SyncOptions {
        dry_run: cli.dry_run,
        force_update: cli.force_update,
    };

    reconcile::run(&mut db, &cli.text_database, &base, options)
}

/// Progress goes to stdout; conflicts and forced resolutions to stderr, so
/// they stay visible when stdout is piped away.
fn print_report(report: &SyncReport, cli: &Cli) -> Result<(), Error> {
    if cli.json {
        let output = serde_json::json!({
            "success": true,
            "dry_run": cli.dry_run,
            "report": report,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if !cli.quiet {
        if report.created_text_db {
            println!("Creating new text database file.");
        }

        if report.new_from_mendeley.is_empty() {
            println!("No new files from Mendeley.");
        } else {
            println!("New files from Mendeley:");
            for record in &report.new_from_mendeley {
                println!("  {}", record.name);
            }
        }

        if report.new_from_text.is_empty() {
            println!("No new files from the text database.");
        } else {
            println!("New files from the text database:");
            for record in &report.new_from_text {
                println!("  {}", record.name);
            }
        }
    }

    for resolved in &report.forced_updates {
        eprintln!(
            "{}: {} to {}",
            "Forcing update".yellow(),
            resolved.mendeley_name,
            resolved.text_name
        );
    }
    for conflict in &report.conflicts {
        eprintln!(
            "{}: {}, {}",
            "Conflict".red().bold(),
            conflict.mendeley_name,
            conflict.text_name
        );
    }

    if !cli.quiet {
        if let Some(preview) = &report.text_file_preview {
            println!("Text file:");
            print!("{preview}");
        }
    }

    Ok(())
}
