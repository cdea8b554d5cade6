//! Merged artifacts and their one-shot delivery.
//!
//! Each merge attempt leaves an [`ArtifactRecord`] naming its output. The
//! record outlives the session's working files so the caller can fetch the
//! result after cleanup. Delivery reads the file once, deletes it and drops
//! the record; a second fetch for the same session fails with
//! [`MergerError::NoSuchArtifact`].
//!
//! Artifacts are stored as `<root>/<session-id>-<filename>`. Session ids may
//! contain `-`, so two sessions can name the same path; a reservation is
//! refused while another session's pending or ready artifact holds it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MergerError, Result};
use crate::session::SessionId;

/// Where an artifact is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Named; the merge tool is running.
    Pending,
    /// The merge tool exited successfully.
    Ready,
    /// The merge tool failed or could not run.
    Failed,
}

/// Generated output name recorded for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    /// Generated filename shown to the caller.
    pub filename: String,

    /// Resolved location on disk.
    pub path: PathBuf,

    /// Lifecycle state.
    pub state: ArtifactState,
}

/// Merged output handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedArtifact {
    /// Generated filename.
    pub filename: String,

    /// File content.
    pub content: Vec<u8>,
}

/// Registry of generated outputs, keyed by session.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    records: Mutex<HashMap<SessionId, ArtifactRecord>>,
}

impl ArtifactStore {
    /// Create a store placing artifacts under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the artifact `filename` for `session`.
    pub fn artifact_path(&self, session: &SessionId, filename: &str) -> PathBuf {
        self.root.join(format!("{session}-{filename}"))
    }

    /// Record `filename` as the pending output of `session`.
    ///
    /// A failed earlier attempt is replaced.
    ///
    /// # Errors
    ///
    /// - [`MergerError::SessionClosed`] if the session already has a pending
    ///   or ready artifact
    /// - [`MergerError::StorageIo`] if another session's pending or ready
    ///   artifact resolves to the same path
    pub fn reserve(&self, session: &SessionId, filename: &str) -> Result<PathBuf> {
        let mut records = self.records.lock();
        if let Some(existing) = records.get(session)
            && existing.state != ArtifactState::Failed
        {
            return Err(MergerError::session_closed(session));
        }

        let path = self.artifact_path(session, filename);
        let taken = records.iter().any(|(owner, record)| {
            owner != session && record.state != ArtifactState::Failed && record.path == path
        });
        if taken {
            tracing::warn!(session = %session, path = %path.display(), "artifact path claimed by another session");
            return Err(MergerError::storage(
                &path,
                io::Error::new(
                    ErrorKind::AlreadyExists,
                    "artifact path is held by another session",
                ),
            ));
        }

        records.insert(
            session.clone(),
            ArtifactRecord {
                filename: filename.to_string(),
                path: path.clone(),
                state: ArtifactState::Pending,
            },
        );
        Ok(path)
    }

    /// Whether the session has a pending or ready artifact.
    pub fn is_claimed(&self, session: &SessionId) -> bool {
        self.records
            .lock()
            .get(session)
            .is_some_and(|r| r.state != ArtifactState::Failed)
    }

    /// Update the state of a session's record, if it has one.
    pub fn mark(&self, session: &SessionId, state: ArtifactState) {
        if let Some(record) = self.records.lock().get_mut(session) {
            record.state = state;
        }
    }

    /// Current record for a session.
    pub fn record(&self, session: &SessionId) -> Option<ArtifactRecord> {
        self.records.lock().get(session).cloned()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Take the merged output of `session`, deleting it from storage.
    ///
    /// Only one caller can take a given artifact: the record is removed
    /// under the lock before the file is read, so a concurrent second
    /// caller sees no record.
    ///
    /// # Errors
    ///
    /// - [`MergerError::NoSuchArtifact`] if the session was never merged,
    ///   its merge failed or is still running, or it was already delivered
    /// - [`MergerError::ArtifactMissing`] if the file is gone from disk
    /// - [`MergerError::StorageIo`] if the file cannot be read; the record
    ///   is restored so delivery can be retried
    pub async fn deliver(&self, session: &SessionId) -> Result<MergedArtifact> {
        let record = self.take_ready(session)?;

        let content = match fs::read(&record.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(session = %session, path = %record.path.display(), "merged artifact missing");
                return Err(MergerError::ArtifactMissing { path: record.path });
            }
            Err(e) => {
                let path = record.path.clone();
                self.records.lock().insert(session.clone(), record);
                return Err(MergerError::storage(path, e));
            }
        };

        if let Err(e) = fs::remove_file(&record.path).await {
            tracing::warn!(
                session = %session,
                path = %record.path.display(),
                error = %e,
                "unable to delete delivered artifact"
            );
        }

        tracing::info!(session = %session, file = %record.filename, size = content.len(), "delivered merged artifact");
        Ok(MergedArtifact {
            filename: record.filename,
            content,
        })
    }

    fn take_ready(&self, session: &SessionId) -> Result<ArtifactRecord> {
        let mut records = self.records.lock();
        match records.get(session).map(|r| r.state) {
            Some(ArtifactState::Ready) => records
                .remove(session)
                .ok_or_else(|| MergerError::no_such_artifact(session)),
            Some(ArtifactState::Failed) => {
                records.remove(session);
                Err(MergerError::no_such_artifact(session))
            }
            Some(ArtifactState::Pending) | None => Err(MergerError::no_such_artifact(session)),
        }
    }

    /// Remove a partial output left behind by a failed merge.
    pub async fn discard_output(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed partial merge output"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unable to remove partial merge output")
            }
        }
    }
}
