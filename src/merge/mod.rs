//! Merging a session's files with the external tool.
//!
//! - [`naming`] derives the output filename from the input filenames
//! - [`invoker`] runs the configured merge executable

pub mod invoker;
pub mod naming;

pub use invoker::MergeInvoker;
pub use naming::OutputNamer;

use serde::Serialize;
use std::time::Duration;

use crate::session::SessionId;

/// Summary of a successful merge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    /// Session that was merged.
    pub session: SessionId,

    /// Generated artifact filename.
    pub filename: String,

    /// Input filenames in the order they were merged.
    pub merged_files: Vec<String>,

    /// Total size of the inputs.
    pub input_size: u64,

    /// Time the merge tool ran.
    #[serde(with = "millis")]
    pub merge_time: Duration,
}

impl MergeOutcome {
    /// Number of files merged.
    pub fn files_merged(&self) -> usize {
        self.merged_files.len()
    }
}

mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}
