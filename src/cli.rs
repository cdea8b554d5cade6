//! CLI argument parsing for pdfmerger.
//!
//! The binary drives one session end to end: it uploads the given files,
//! merges them with the configured tool and writes the delivered artifact.

use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use pdfmerger::config::{Config, INPUTS_TOKEN, OUTPUT_TOKEN};
use pdfmerger::error::{MergerError, Result};
use pdfmerger::utils::collect_paths_for_patterns;

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteMode {
    /// Ask before overwriting.
    Prompt,
    /// Overwrite silently.
    Force,
    /// Fail instead of overwriting.
    NoClobber,
}

/// Merge PDF files through an external merge tool.
///
/// Every input is validated and uploaded into a fresh session, the session
/// is merged in the order the inputs were given, and the merged file is
/// written to the output path. Working files are removed afterwards.
#[derive(Parser, Debug)]
#[command(name = "pdfmerger")]
#[command(version)]
#[command(about = "Merge PDF files through an external merge tool", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Input PDF files or glob patterns (in merge order)
    ///
    /// Examples:
    ///   pdfmerger cover.pdf body.pdf -o book.pdf
    ///   pdfmerger 'chapter*.pdf' -o book.pdf
    #[arg(value_name = "FILE", required_unless_present = "input_list")]
    pub inputs: Vec<String>,

    /// Output file or directory
    ///
    /// Defaults to the generated name (e.g. cover_and_body_merged.pdf) in
    /// the current directory. A directory receives the generated name.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Merge order as a comma-separated list of uploaded filenames
    ///
    /// Must name every uploaded file exactly once (duplicates as often as
    /// they were uploaded).
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub order: Option<Vec<String>>,

    /// Read input paths from a file (one per line, '#' comments)
    ///
    /// Use '-' to read from stdin. Listed paths follow the direct inputs.
    #[arg(long, value_name = "FILE")]
    pub input_list: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE", env = "PDFMERGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Merge tool executable
    #[arg(long, value_name = "PATH")]
    pub tool: Option<PathBuf>,

    /// Merge tool argument template entry (repeatable, replaces the template)
    ///
    /// '{inputs}' expands to the input paths, '{output}' to the output path.
    #[arg(long = "tool-arg", value_name = "TOKEN", allow_hyphen_values = true)]
    pub tool_args: Vec<String>,

    /// Directory for session working files
    #[arg(long, value_name = "DIR")]
    pub storage_root: Option<PathBuf>,

    /// Kill the merge tool after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Skip rejected inputs with a warning instead of stopping
    #[arg(long)]
    pub continue_on_error: bool,

    /// Upload and validate the inputs, then discard the session without merging
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Overwrite the output file without asking
    #[arg(short, long)]
    pub force: bool,

    /// Never overwrite an existing output file
    #[arg(long, conflicts_with = "force")]
    pub no_clobber: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show per-file and timing details, and debug logs
    #[arg(short, long)]
    pub verbose: bool,

    /// Print a JSON report instead of the human-readable summary
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Build the service configuration: the `--config` file, if any, with
    /// command-line overrides applied on top.
    ///
    /// # Errors
    ///
    /// Returns [`MergerError::InvalidConfig`] if the file cannot be loaded or
    /// the resulting configuration is invalid.
    pub fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)
                .map_err(|e| MergerError::invalid_config(format!("{e:#}")))?,
            None => Config::default(),
        };

        if let Some(tool) = &self.tool {
            config.merge_tool.program = tool.clone();
        }
        if !self.tool_args.is_empty() {
            config.merge_tool.args = self.tool_args.clone();
        }
        if let Some(root) = &self.storage_root {
            config.storage_root = root.clone();
        }
        if self.timeout.is_some() {
            config.merge_timeout_secs = self.timeout;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate arguments that don't need any I/O.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() && self.input_list.is_none() {
            return Err(MergerError::invalid_config("No input files specified"));
        }

        if self.timeout == Some(0) {
            return Err(MergerError::invalid_config(
                "Timeout must be at least 1 second",
            ));
        }

        if let Some(order) = &self.order
            && order.iter().any(|name| name.trim().is_empty())
        {
            return Err(MergerError::invalid_config(
                "Merge order contains an empty filename",
            ));
        }

        if !self.tool_args.is_empty() {
            for token in [INPUTS_TOKEN, OUTPUT_TOKEN] {
                if !self.tool_args.iter().any(|arg| arg == token) {
                    return Err(MergerError::invalid_config(format!(
                        "--tool-arg template must contain {token}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Overwrite behaviour selected by the flags.
    pub fn overwrite_mode(&self) -> OverwriteMode {
        if self.force {
            OverwriteMode::Force
        } else if self.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Prompt
        }
    }

    /// Default log filter for the selected verbosity.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }

    /// Merge order with surrounding whitespace removed.
    pub fn order(&self) -> Option<Vec<String>> {
        self.order
            .as_ref()
            .map(|names| names.iter().map(|n| n.trim().to_string()).collect())
    }

    /// Where to write an artifact named `generated`.
    pub fn output_path(&self, generated: &str) -> PathBuf {
        match &self.output {
            Some(path) if path.is_dir() => path.join(generated),
            Some(path) => path.clone(),
            None => PathBuf::from(generated),
        }
    }

    /// All inputs: expanded direct inputs followed by the input list.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern matches nothing, a literal path does
    /// not exist, or the input list cannot be read.
    pub async fn get_all_inputs(&self) -> Result<Vec<PathBuf>> {
        let mut all_inputs = if self.inputs.is_empty() {
            Vec::new()
        } else {
            collect_paths_for_patterns(&self.inputs)?
        };

        if let Some(list) = &self.input_list {
            all_inputs.extend(read_input_list(list).await?);
        }

        if all_inputs.is_empty() {
            return Err(MergerError::NoFilesToMerge);
        }

        Ok(all_inputs)
    }
}

/// Read input paths from a file, or stdin for `-`.
async fn read_input_list(path: &Path) -> Result<Vec<PathBuf>> {
    if path.as_os_str() == "-" {
        return parse_input_list(BufReader::new(tokio::io::stdin()), path).await;
    }

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| MergerError::storage(path, e))?;
    parse_input_list(BufReader::new(file), path).await
}

async fn parse_input_list<R>(reader: R, source: &Path) -> Result<Vec<PathBuf>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut paths = Vec::new();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| MergerError::storage(source, e))?
    {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        paths.push(PathBuf::from(line));
    }

    Ok(paths)
}
