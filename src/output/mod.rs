//! Output formatting and display for pdfmerger.
//!
//! This module handles the user-facing output of the binary:
//! - Formatted status messages
//! - Admission and merge summaries
//! - Quiet and verbose modes
//!
//! Library code logs through `tracing`; only front ends print.

pub mod formatter;

pub use formatter::{MessageLevel, OutputFormatter};

use crate::merge::MergeOutcome;
use crate::session::StoredFile;
use crate::utils::format_file_size;

/// Display the files admitted to a session, in merge order.
///
/// # Arguments
///
/// * `formatter` - Output formatter to use
/// * `files` - Stored files in merge order
/// * `rejected` - Number of uploads that were skipped
pub fn display_admission_summary(formatter: &OutputFormatter, files: &[StoredFile], rejected: usize) {
    if rejected > 0 {
        formatter.warning(&format!("Warning: {rejected} file(s) were rejected"));
    }

    let total: u64 = files.iter().map(|f| f.size).sum();
    formatter.info(&format!(
        "Uploaded {} file(s), {}",
        files.len(),
        format_file_size(total)
    ));

    for (i, file) in files.iter().enumerate() {
        formatter.list_item(i + 1, &file.filename);
    }
}

/// Display the result of a merge.
pub fn display_merge_outcome(formatter: &OutputFormatter, outcome: &MergeOutcome) {
    formatter.info(&format!(
        "Merged {} file(s) into {} in {:.2}s",
        outcome.files_merged(),
        outcome.filename,
        outcome.merge_time.as_secs_f64()
    ));

    if formatter.is_verbose() {
        formatter.section("Statistics");
        formatter.detail("Session", outcome.session.as_str());
        formatter.detail("Input files", &outcome.files_merged().to_string());
        formatter.detail("Input size", &format_file_size(outcome.input_size));
        formatter.detail(
            "Merge time",
            &format!("{:.2}s", outcome.merge_time.as_secs_f64()),
        );
    }
}
