//! Upload validation for pdfmerger.
//!
//! The [`UploadValidator`] is a pure gate applied to every upload before it is
//! admitted to a session. It looks at the proposed filename and declared byte
//! length only; it never touches storage and never builds a path.
//!
//! Checks run in a fixed order and the first failing one is reported:
//! 1. the filename ends in the accepted extension
//! 2. the content is not empty
//! 3. the filename cannot escape the session directory
//!
//! # Examples
//!
//! ```
//! use pdfmerger::validation::{RejectReason, UploadValidator, Verdict};
//!
//! let validator = UploadValidator::for_pdf();
//! assert_eq!(validator.check("report.pdf", 1024), Verdict::Accept);
//! assert_eq!(
//!     validator.check("../report.pdf", 1024),
//!     Verdict::Reject(RejectReason::PathTraversal)
//! );
//! ```

use std::path::{Component, Path};

use crate::error::{MergerError, Result};

/// Why an upload was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Filename lacks the accepted extension.
    InvalidFormat,
    /// Zero-length content.
    EmptyContent,
    /// Filename contains `..`, a separator, or is not a single plain component.
    PathTraversal,
}

impl RejectReason {
    /// Turn the reason into the error reported for `filename`.
    pub fn into_error(self, filename: &str) -> MergerError {
        let filename = filename.to_string();
        match self {
            Self::InvalidFormat => MergerError::InvalidFormat { filename },
            Self::EmptyContent => MergerError::EmptyContent { filename },
            Self::PathTraversal => MergerError::PathTraversal { filename },
        }
    }
}

/// Outcome of validating one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The upload may be stored.
    Accept,
    /// The upload must not be stored.
    Reject(RejectReason),
}

/// Gate for incoming uploads.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    /// Suffix including the dot, e.g. `.pdf`.
    suffix: String,
}

impl UploadValidator {
    /// Create a validator accepting `extension` (without the dot),
    /// compared case-sensitively.
    pub fn new(extension: &str) -> Self {
        Self {
            suffix: format!(".{}", extension.trim_start_matches('.')),
        }
    }

    /// Create a validator accepting `.pdf` files.
    pub fn for_pdf() -> Self {
        Self::new("pdf")
    }

    /// Suffix (with dot) this validator accepts.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Classify an upload.
    pub fn check(&self, filename: &str, len: u64) -> Verdict {
        if !self.has_accepted_extension(filename) {
            Verdict::Reject(RejectReason::InvalidFormat)
        } else if len == 0 {
            Verdict::Reject(RejectReason::EmptyContent)
        } else if escapes_directory(filename) {
            Verdict::Reject(RejectReason::PathTraversal)
        } else {
            Verdict::Accept
        }
    }

    /// Validate an upload, returning the matching error on rejection.
    pub fn validate(&self, filename: &str, len: u64) -> Result<()> {
        match self.check(filename, len) {
            Verdict::Accept => Ok(()),
            Verdict::Reject(reason) => Err(reason.into_error(filename)),
        }
    }

    fn has_accepted_extension(&self, filename: &str) -> bool {
        filename.ends_with(&self.suffix)
    }
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::for_pdf()
    }
}

/// Lexical check that `filename` is exactly one plain path component.
///
/// Any `..` substring is refused outright, as are separators and NUL bytes,
/// so no interpretation of the name can climb out of its directory.
fn escapes_directory(filename: &str) -> bool {
    if filename.contains("..") || filename.contains(['/', '\\', '\0']) {
        return true;
    }

    let mut components = Path::new(filename).components();
    !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
