//! Configuration module for pdfmerger.
//!
//! A [`Config`] describes where session state lives on disk, which uploads
//! are acceptable, and how the external merge tool is invoked. It can be
//! loaded from a JSON file and is validated before a service is built from it.

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{MergerError, Result};

/// Template token that expands to every input path, in merge order.
pub const INPUTS_TOKEN: &str = "{inputs}";

/// Template token that expands to the output path.
pub const OUTPUT_TOKEN: &str = "{output}";

/// How the external merge tool is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeToolConfig {
    /// Path of the merge executable.
    pub program: PathBuf,

    /// Argument template. [`INPUTS_TOKEN`] and [`OUTPUT_TOKEN`] are
    /// substituted, anything else is passed through literally.
    pub args: Vec<String>,
}

impl Default for MergeToolConfig {
    /// `pdfunite <inputs>... <output>`
    fn default() -> Self {
        Self {
            program: PathBuf::from("/usr/bin/pdfunite"),
            args: vec![INPUTS_TOKEN.to_string(), OUTPUT_TOKEN.to_string()],
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Root directory for session directories and merged artifacts.
    pub storage_root: PathBuf,

    /// Extension (without the dot) an upload must carry.
    pub accepted_extension: String,

    /// External merge tool invocation.
    pub merge_tool: MergeToolConfig,

    /// Kill the merge tool if it runs longer than this many seconds.
    pub merge_timeout_secs: Option<u64>,

    /// Output name used when a merge has no named inputs.
    pub default_output_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./tmp"),
            accepted_extension: "pdf".to_string(),
            merge_tool: MergeToolConfig::default(),
            merge_timeout_secs: None,
            default_output_name: "merged.pdf".to_string(),
        }
    }
}

impl Config {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("Malformed configuration")?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    /// Merge timeout, if one is configured.
    pub fn merge_timeout(&self) -> Option<Duration> {
        self.merge_timeout_secs.map(Duration::from_secs)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MergerError::InvalidConfig`] if:
    /// - The accepted extension is empty or contains a dot or separator
    /// - The merge program is empty
    /// - The argument template lacks exactly one inputs and one output token
    /// - The default output name is not a plain filename
    /// - The timeout is zero
    pub fn validate(&self) -> Result<()> {
        self.check().map_err(|e| MergerError::invalid_config(e.to_string()))
    }

    fn check(&self) -> anyhow::Result<()> {
        let ext = &self.accepted_extension;
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            bail!("Accepted extension must be a bare extension like \"pdf\", got {ext:?}");
        }

        if self.merge_tool.program.as_os_str().is_empty() {
            bail!("Merge tool program must not be empty");
        }

        let count = |token: &str| self.merge_tool.args.iter().filter(|a| *a == token).count();
        if count(INPUTS_TOKEN) != 1 || count(OUTPUT_TOKEN) != 1 {
            bail!(
                "Merge tool arguments must contain {INPUTS_TOKEN} and {OUTPUT_TOKEN} exactly once each"
            );
        }

        let name = &self.default_output_name;
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            bail!("Default output name must be a plain filename, got {name:?}");
        }

        if self.merge_timeout_secs == Some(0) {
            bail!("Merge timeout must be at least 1 second");
        }

        Ok(())
    }
}
