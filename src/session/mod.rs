//! Sessions and the files they own.
//!
//! A session is one logical merge request. It owns an ordered list of
//! [`StoredFile`]s living in its own working directory; that order is the
//! merge order.

pub mod cleaner;
pub mod registry;

pub use cleaner::{CleanupReport, SessionCleaner};
pub use registry::{SessionHandle, SessionRegistry};

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{MergerError, Result};

const MAX_ID_LEN: usize = 128;

/// Opaque session identifier.
///
/// Ids double as directory names under the storage root, so only ASCII
/// alphanumerics, `-` and `_` are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh, unpredictable id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate a caller-supplied id.
    ///
    /// # Errors
    ///
    /// Returns [`MergerError::InvalidSessionId`] if the id is empty, longer
    /// than 128 characters, or contains anything but `[A-Za-z0-9_-]`.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && raw.len() <= MAX_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

        if valid {
            Ok(Self(raw))
        } else {
            Err(MergerError::InvalidSessionId { id: raw })
        }
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = MergerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A validated, persisted copy of one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// Filename as uploaded.
    pub filename: String,

    /// Location inside the session's working directory.
    pub path: PathBuf,

    /// Bytes written.
    pub size: u64,
}

/// In-flight state of one session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    dir: PathBuf,
    files: Vec<StoredFile>,
    closed: bool,
}

impl Session {
    pub(crate) fn new(id: SessionId, dir: PathBuf) -> Self {
        Self {
            id,
            dir,
            files: Vec::new(),
            closed: false,
        }
    }

    /// Session id.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Working directory.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Admitted files, in admission (merge) order.
    pub fn files(&self) -> &[StoredFile] {
        &self.files
    }

    /// Whether the session has been merged or abandoned.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn push(&mut self, file: StoredFile) {
        self.files.push(file);
    }

    pub(crate) fn replace_files(&mut self, files: Vec<StoredFile>) {
        self.files = files;
    }

    /// Drop the file list and refuse further use.
    pub(crate) fn close(&mut self) {
        self.closed = true;
        self.files.clear();
    }
}
