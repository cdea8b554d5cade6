//! pdfmerger - merge PDF files through an external merge tool.
//!
//! Runs one session: upload every input, merge, deliver, write the result.

mod cli;

use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, OverwriteMode};
use pdfmerger::error::{MergerError, Result};
use pdfmerger::merge::OutputNamer;
use pdfmerger::output::{OutputFormatter, display_admission_summary, display_merge_outcome};
use pdfmerger::utils::format_file_size;
use pdfmerger::{MergeOutcome, MergeService, SessionId, StoredFile, Upload};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

/// Log to stderr. `RUST_LOG` takes precedence over -q/-v.
fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Machine-readable summary printed with `--json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    session: SessionId,
    uploaded: Vec<StoredFile>,
    rejected: Vec<Rejection>,
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    merge: Option<MergeOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Rejection {
    path: PathBuf,
    reason: String,
}

/// Main application logic.
async fn run(cli: Cli) -> Result<()> {
    cli.validate()?;
    let config = cli.to_config()?;
    let inputs = cli.get_all_inputs().await?;

    let formatter = if cli.json {
        OutputFormatter::quiet()
    } else {
        OutputFormatter::new(cli.quiet, cli.verbose)
    };

    if formatter.should_print() {
        formatter.section(&format!("{} v{}", pdfmerger::NAME, pdfmerger::VERSION));
        formatter.blank_line();
    }

    let service = MergeService::new(&config)?;
    service.init().await?;

    let session = SessionId::generate();
    formatter.debug(&format!("Session {session}"));
    formatter.info(&format!("Uploading {} file(s)...", inputs.len()));

    let prepared = prepare(&service, &session, &cli, &inputs, &formatter).await;
    let rejected = match prepared {
        Ok(rejected) => rejected,
        Err(e) => {
            service.abandon(&session).await;
            return Err(e);
        }
    };

    let uploaded = service.files_for(&session).await;
    if formatter.should_print() {
        display_admission_summary(&formatter, &uploaded, rejected.len());
        formatter.blank_line();
    }

    let names: Vec<&str> = uploaded.iter().map(|f| f.filename.as_str()).collect();
    let expected_name = OutputNamer::new(&config.default_output_name).name_for(&names);
    let target = cli.output_path(&expected_name);

    let mut report = Report {
        session: session.clone(),
        uploaded,
        rejected,
        dry_run: cli.dry_run,
        merge: None,
        output: None,
    };

    if cli.dry_run {
        service.abandon(&session).await;
        formatter.success("Dry run completed successfully");
        formatter.info(&format!("  Output would be: {}", target.display()));
        formatter.info("  Run without --dry-run to merge");
        return print_report(&cli, &report);
    }

    if let Err(e) = handle_output_overwrite(&target, cli.overwrite_mode(), &formatter) {
        service.abandon(&session).await;
        return Err(e);
    }

    formatter.info("Merging documents...");
    let outcome = service.merge(&session).await?;
    if formatter.should_print() {
        display_merge_outcome(&formatter, &outcome);
    }

    let artifact = service.deliver(&session).await?;
    tokio::fs::write(&target, &artifact.content)
        .await
        .map_err(|e| MergerError::storage(&target, e))?;

    formatter.blank_line();
    formatter.success(&format!(
        "Successfully created {} ({})",
        target.display(),
        format_file_size(artifact.content.len() as u64)
    ));

    report.merge = Some(outcome);
    report.output = Some(target);
    print_report(&cli, &report)
}

/// Upload every input in order and apply `--order`.
///
/// Returns the inputs skipped under `--continue-on-error`.
async fn prepare(
    service: &MergeService,
    session: &SessionId,
    cli: &Cli,
    inputs: &[PathBuf],
    formatter: &OutputFormatter,
) -> Result<Vec<Rejection>> {
    let mut rejected = Vec::new();

    for path in inputs {
        let admitted = match Upload::from_path(path).await {
            Ok(upload) => service.admit(session, upload).await,
            Err(e) => Err(e),
        };
        match admitted {
            Ok(stored) => formatter.debug(&format!(
                "Uploaded {} ({})",
                stored.filename,
                format_file_size(stored.size)
            )),
            Err(e) if e.is_rejection() && cli.continue_on_error => {
                // The JSON report lists rejections; keep stdout parseable.
                if !cli.json {
                    formatter.warning(&format!("Skipping {}: {e}", path.display()));
                }
                rejected.push(Rejection {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(order) = cli.order() {
        service.reorder(session, &order).await?;
        formatter.debug(&format!("Applied merge order: {}", order.join(", ")));
    }

    Ok(rejected)
}

fn print_report(cli: &Cli, report: &Report) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| MergerError::other(format!("Failed to serialize report: {e}")))?;
        println!("{json}");
    }
    Ok(())
}

/// Handle output file overwrite scenarios.
fn handle_output_overwrite(
    output: &Path,
    mode: OverwriteMode,
    formatter: &OutputFormatter,
) -> Result<()> {
    if !output.exists() {
        return Ok(());
    }

    let exists = || MergerError::OutputExists {
        path: output.to_path_buf(),
    };

    match mode {
        OverwriteMode::Force => Ok(()),
        OverwriteMode::NoClobber => Err(exists()),
        OverwriteMode::Prompt => {
            // Nobody to ask in quiet mode
            if formatter.is_quiet() {
                return Err(exists());
            }

            formatter.warning(&format!(
                "Output file already exists: {}",
                output.display()
            ));

            use std::io::{self, Write};
            print!("Overwrite? [y/N]: ");
            io::stdout().flush().ok();

            let mut response = String::new();
            io::stdin()
                .read_line(&mut response)
                .map_err(|err| MergerError::other(format!("Failed to read input: {err}")))?;

            match response.trim().to_lowercase().as_str() {
                "y" | "yes" => Ok(()),
                _ => Err(MergerError::Cancelled),
            }
        }
    }
}
