//! Error types for pdfmerger.
//!
//! Every failure the service can report to a caller is a variant of
//! [`MergerError`]. Errors carry the filename, session or path involved so a
//! front end can turn them into a useful response without extra lookups.
//!
//! # Error Categories
//!
//! - **Admission**: the upload was rejected before touching its bytes
//! - **Merge**: nothing to merge, or the external tool failed
//! - **Delivery**: the artifact was never produced, already taken, or vanished
//! - **Storage**: unexpected disk errors, wrapping the underlying cause

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for pdfmerger operations.
pub type Result<T> = std::result::Result<T, MergerError>;

/// Main error type for pdfmerger operations.
#[derive(Debug, thiserror::Error)]
pub enum MergerError {
    /// Uploaded filename does not end in the accepted extension.
    #[error("{filename} doesn't seem to be a PDF file")]
    InvalidFormat {
        /// Offending filename.
        filename: String,
    },

    /// Uploaded file has no content.
    #[error("{filename} is empty")]
    EmptyContent {
        /// Offending filename.
        filename: String,
    },

    /// Uploaded filename would resolve outside the session directory.
    #[error("Sorry, can't navigate the filesystem: {filename}")]
    PathTraversal {
        /// Offending filename.
        filename: String,
    },

    /// Session id cannot be used as a directory name.
    #[error("Invalid session id: {id:?}")]
    InvalidSessionId {
        /// The rejected id.
        id: String,
    },

    /// Session has already been merged (or is being merged).
    #[error("Session {session} has already been merged")]
    SessionClosed {
        /// Session id.
        session: String,
    },

    /// The session holds no files, so the merge tool is never invoked.
    #[error("No files to merge")]
    NoFilesToMerge,

    /// The merge tool exited with a non-zero status.
    #[error("Merging process exited with {}", describe_exit(.code))]
    MergeToolFailed {
        /// Exit code, or `None` if the process was killed by a signal.
        code: Option<i32>,
    },

    /// The merge tool could not be started.
    #[error("Failed to launch merge tool: {}\n  Reason: {source}", .program.display())]
    MergeToolUnavailable {
        /// Configured program path.
        program: PathBuf,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },

    /// The merge tool did not exit within the configured timeout.
    #[error("Merge tool did not finish within {}s", .timeout.as_secs())]
    MergeTimedOut {
        /// Configured timeout.
        timeout: Duration,
    },

    /// No artifact is recorded for the session (never merged, failed, or
    /// already delivered).
    #[error("No merged PDF available for session {session}")]
    NoSuchArtifact {
        /// Session id.
        session: String,
    },

    /// An artifact was recorded but its file is gone.
    #[error("Trying to access merged PDF file that doesn't exist: {}", .path.display())]
    ArtifactMissing {
        /// Expected artifact path.
        path: PathBuf,
    },

    /// Caller-supplied ordering does not match the uploaded files.
    #[error("File order doesn't match the uploaded files: {details}")]
    InvalidOrder {
        /// What is missing or unexpected.
        details: String,
    },

    /// Unexpected disk error.
    #[error("Storage failure at {}\n  Reason: {source}", .path.display())]
    StorageIo {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What's wrong with the configuration.
        message: String,
    },

    /// Output file already exists and overwrite is not allowed.
    #[error(
        "Output file already exists: {}\n  Use --force to overwrite or choose a different output path",
        .path.display()
    )]
    OutputExists {
        /// Path to the existing output file.
        path: PathBuf,
    },

    /// User cancelled the operation.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("error code: {code}"),
        None => "a signal before finishing".to_string(),
    }
}

impl From<anyhow::Error> for MergerError {
    fn from(err: anyhow::Error) -> Self {
        Self::other(format!("{err:#}"))
    }
}

impl MergerError {
    /// Create a StorageIo error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StorageIo {
            path: path.into(),
            source,
        }
    }

    /// Create a NoSuchArtifact error.
    pub fn no_such_artifact(session: impl ToString) -> Self {
        Self::NoSuchArtifact {
            session: session.to_string(),
        }
    }

    /// Create a SessionClosed error.
    pub fn session_closed(session: impl ToString) -> Self {
        Self::SessionClosed {
            session: session.to_string(),
        }
    }

    /// Create an InvalidOrder error.
    pub fn invalid_order(details: impl Into<String>) -> Self {
        Self::InvalidOrder {
            details: details.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error is an admission-time rejection of an upload.
    ///
    /// Rejections leave the session usable; callers may skip the file and
    /// keep uploading.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat { .. } | Self::EmptyContent { .. } | Self::PathTraversal { .. }
        )
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidFormat { .. } => 2,
            Self::EmptyContent { .. } => 2,
            Self::PathTraversal { .. } => 2,
            Self::InvalidSessionId { .. } => 1,
            Self::SessionClosed { .. } => 1,
            Self::NoFilesToMerge => 1,
            Self::MergeToolFailed { .. } => 6,
            Self::MergeToolUnavailable { .. } => 6,
            Self::MergeTimedOut { .. } => 6,
            Self::NoSuchArtifact { .. } => 3,
            Self::ArtifactMissing { .. } => 3,
            Self::InvalidOrder { .. } => 1,
            Self::StorageIo { .. } => 5,
            Self::InvalidConfig { .. } => 1,
            Self::OutputExists { .. } => 4,
            Self::Cancelled => 130, // Standard exit code for SIGINT
            Self::Other { .. } => 1,
        }
    }
}
