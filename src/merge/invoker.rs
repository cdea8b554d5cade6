//! Invocation of the external merge tool.
//!
//! The tool is started directly from an argument vector; no shell is
//! involved, so every input path reaches the tool as one argument no matter
//! what whitespace or metacharacters it contains.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::config::{INPUTS_TOKEN, MergeToolConfig, OUTPUT_TOKEN};
use crate::error::{MergerError, Result};

/// One element of the argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ArgToken {
    Inputs,
    Output,
    Literal(String),
}

/// Runs the configured merge executable over a list of files.
#[derive(Debug, Clone)]
pub struct MergeInvoker {
    program: PathBuf,
    template: Vec<ArgToken>,
    timeout: Option<Duration>,
}

impl MergeInvoker {
    /// Build an invoker from the tool configuration.
    pub fn new(tool: &MergeToolConfig) -> Self {
        let template = tool
            .args
            .iter()
            .map(|arg| match arg.as_str() {
                INPUTS_TOKEN => ArgToken::Inputs,
                OUTPUT_TOKEN => ArgToken::Output,
                literal => ArgToken::Literal(literal.to_string()),
            })
            .collect();

        Self {
            program: tool.program.clone(),
            template,
            timeout: None,
        }
    }

    /// Kill the tool if it has not exited after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured program.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument vector for merging `inputs` into `output`.
    pub fn command_args(&self, inputs: &[PathBuf], output: &Path) -> Vec<OsString> {
        let mut args = Vec::with_capacity(self.template.len() + inputs.len());
        for token in &self.template {
            match token {
                ArgToken::Inputs => args.extend(inputs.iter().map(|p| p.as_os_str().to_owned())),
                ArgToken::Output => args.push(output.as_os_str().to_owned()),
                ArgToken::Literal(literal) => args.push(OsString::from(literal)),
            }
        }
        args
    }

    /// Merge `inputs`, in order, into `output` and wait for the tool to exit.
    ///
    /// # Errors
    ///
    /// - [`MergerError::NoFilesToMerge`] if `inputs` is empty; the tool is not started
    /// - [`MergerError::MergeToolUnavailable`] if the tool cannot be spawned
    /// - [`MergerError::MergeToolFailed`] if it exits non-zero
    /// - [`MergerError::MergeTimedOut`] if it outlives the timeout
    pub async fn run(&self, inputs: &[PathBuf], output: &Path) -> Result<Duration> {
        if inputs.is_empty() {
            return Err(MergerError::NoFilesToMerge);
        }

        let args = self.command_args(inputs, output);
        tracing::debug!(program = %self.program.display(), args = ?args, "invoking merge tool");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let output = self.wait(command).await?;
        let elapsed = start.elapsed();

        if output.status.success() {
            tracing::info!(files = inputs.len(), elapsed_ms = elapsed.as_millis() as u64, "merge tool succeeded");
            return Ok(elapsed);
        }

        let code = output.status.code();
        tracing::warn!(
            code = ?code,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "merge tool failed"
        );
        Err(MergerError::MergeToolFailed { code })
    }

    async fn wait(&self, mut command: Command) -> Result<Output> {
        let unavailable = |source| MergerError::MergeToolUnavailable {
            program: self.program.clone(),
            source,
        };

        match self.timeout {
            None => command.output().await.map_err(unavailable),
            Some(timeout) => match tokio::time::timeout(timeout, command.output()).await {
                Ok(output) => output.map_err(unavailable),
                // Dropping the future kills the child.
                Err(_) => {
                    tracing::warn!(timeout_secs = timeout.as_secs(), "merge tool timed out");
                    Err(MergerError::MergeTimedOut { timeout })
                }
            },
        }
    }
}
