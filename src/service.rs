//! Session-scoped upload-and-merge orchestration.
//!
//! [`MergeService`] is the boundary a front end talks to:
//!
//! 1. **admit** uploads into a session, one at a time, in the order they
//!    should be merged (optionally **reorder** them afterwards)
//! 2. **merge** the session once all files are in; the working files are
//!    removed whatever the outcome
//! 3. **deliver** the merged artifact exactly once
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerger::{Config, MergeService, SessionId, Upload};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = MergeService::new(&Config::default())?;
//! service.init().await?;
//!
//! let session = SessionId::generate();
//! service.admit(&session, Upload::from_bytes("a.pdf", std::fs::read("a.pdf")?)).await?;
//! service.admit(&session, Upload::from_bytes("b.pdf", std::fs::read("b.pdf")?)).await?;
//!
//! service.merge(&session).await?;
//! let artifact = service.deliver(&session).await?;
//! std::fs::write(&artifact.filename, &artifact.content)?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;

use crate::artifact::{ArtifactState, ArtifactStore, MergedArtifact};
use crate::config::Config;
use crate::error::{MergerError, Result};
use crate::merge::{MergeInvoker, MergeOutcome, OutputNamer};
use crate::session::{CleanupReport, Session, SessionCleaner, SessionId, StoredFile};
use crate::store::{FileStore, Upload};
use crate::validation::UploadValidator;

/// Expected output of a session, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedOutput {
    /// Generated filename.
    pub filename: String,

    /// Where the artifact is (or would be) stored.
    pub path: PathBuf,

    /// Lifecycle state of the artifact.
    pub state: ArtifactState,
}

/// Orchestrates uploads, merges and deliveries for many concurrent sessions.
#[derive(Debug)]
pub struct MergeService {
    store: FileStore,
    namer: OutputNamer,
    invoker: MergeInvoker,
    cleaner: SessionCleaner,
    artifacts: ArtifactStore,
}

impl MergeService {
    /// Build a service from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MergerError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store: FileStore::new(
                &config.storage_root,
                UploadValidator::new(&config.accepted_extension),
            ),
            namer: OutputNamer::new(&config.default_output_name),
            invoker: MergeInvoker::new(&config.merge_tool).with_timeout(config.merge_timeout()),
            cleaner: SessionCleaner::new(),
            artifacts: ArtifactStore::new(&config.storage_root),
        })
    }

    /// Create the storage root. Safe to call repeatedly.
    pub async fn init(&self) -> Result<()> {
        self.store.init().await
    }

    /// Storage root.
    pub fn storage_root(&self) -> &Path {
        self.store.root()
    }

    /// Working directory a session uses.
    pub fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.store.session_dir(session)
    }

    /// Whether a session currently holds working state.
    pub fn is_active(&self, session: &SessionId) -> bool {
        self.store.registry().contains(session)
    }

    /// Validate and store one upload, appending it to the session.
    ///
    /// See [`FileStore::admit`].
    pub async fn admit<R>(&self, session: &SessionId, upload: Upload<R>) -> Result<StoredFile>
    where
        R: AsyncRead + Unpin,
    {
        if self.artifacts.is_claimed(session) {
            return Err(MergerError::session_closed(session));
        }
        self.store.admit(session, upload).await
    }

    /// Files of a session in merge order.
    pub async fn files_for(&self, session: &SessionId) -> Vec<StoredFile> {
        self.store.files_for(session).await
    }

    /// Number of files admitted to a session.
    pub async fn file_count(&self, session: &SessionId) -> usize {
        self.store.file_count(session).await
    }

    /// Apply a caller-supplied order to a session's files.
    ///
    /// See [`FileStore::reorder`].
    pub async fn reorder(&self, session: &SessionId, order: &[String]) -> Result<Vec<StoredFile>> {
        self.store.reorder(session, order).await
    }

    /// Merge a session's files, in order, into one artifact.
    ///
    /// The output name is recorded before the tool runs. Afterwards the
    /// session's working files and registry entry are removed, whether the
    /// merge succeeded or not; the artifact record survives for
    /// [`deliver`](Self::deliver) and [`expected_output`](Self::expected_output).
    ///
    /// # Errors
    ///
    /// - [`MergerError::NoFilesToMerge`] if the session is unknown or empty
    /// - [`MergerError::SessionClosed`] if the session was already merged
    /// - [`MergerError::MergeToolFailed`], [`MergerError::MergeToolUnavailable`],
    ///   [`MergerError::MergeTimedOut`] if the tool did not produce output
    /// - [`MergerError::StorageIo`] if another session's artifact already
    ///   occupies the output path; the tool is not started
    pub async fn merge(&self, session: &SessionId) -> Result<MergeOutcome> {
        if self.artifacts.is_claimed(session) {
            return Err(MergerError::session_closed(session));
        }

        let Some(handle) = self.store.session(session) else {
            return Err(MergerError::NoFilesToMerge);
        };

        let mut guard = handle.lock().await;
        if guard.is_closed() {
            return Err(MergerError::session_closed(session));
        }

        let result = self.run_merge(&guard).await;
        self.finish(&mut guard).await;

        result
    }

    async fn run_merge(&self, session: &Session) -> Result<MergeOutcome> {
        let id = session.id();
        let files = session.files();
        if files.is_empty() {
            tracing::warn!(session = %id, "nothing to merge");
            return Err(MergerError::NoFilesToMerge);
        }

        let names: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();
        let filename = self.namer.name_for(&names);
        let output = self.artifacts.reserve(id, &filename)?;
        tracing::info!(session = %id, files = files.len(), output = %filename, "about to merge");

        let inputs: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        match self.invoker.run(&inputs, &output).await {
            Ok(merge_time) => {
                if !output.exists() {
                    tracing::warn!(session = %id, path = %output.display(), "merge tool reported success without output");
                }
                self.artifacts.mark(id, ArtifactState::Ready);
                tracing::info!(session = %id, files = files.len(), "merged");

                Ok(MergeOutcome {
                    session: id.clone(),
                    filename,
                    merged_files: names,
                    input_size: files.iter().map(|f| f.size).sum(),
                    merge_time,
                })
            }
            Err(e) => {
                // Release the path only once the partial output is gone.
                self.artifacts.discard_output(&output).await;
                self.artifacts.mark(id, ArtifactState::Failed);
                tracing::warn!(session = %id, error = %e, "merge failed");
                Err(e)
            }
        }
    }

    /// Clean up working state and drop the session from the registry.
    async fn finish(&self, session: &mut Session) -> CleanupReport {
        let report = self.cleaner.clean(session).await;
        self.store.forget(session.id());
        report
    }

    /// Give up on a session without merging, removing its working files.
    ///
    /// Returns `None` if the session is unknown or already finished.
    pub async fn abandon(&self, session: &SessionId) -> Option<CleanupReport> {
        let handle = self.store.session(session)?;
        let mut guard = handle.lock().await;
        if guard.is_closed() {
            return None;
        }

        tracing::info!(session = %session, files = guard.files().len(), "abandoning session");
        Some(self.finish(&mut guard).await)
    }

    /// Take the merged artifact of a session. Works once per merge.
    ///
    /// See [`ArtifactStore::deliver`].
    pub async fn deliver(&self, session: &SessionId) -> Result<MergedArtifact> {
        self.artifacts.deliver(session).await
    }

    /// Output recorded for a session, if a merge reached the naming step
    /// and the artifact has not been delivered yet.
    pub fn expected_output(&self, session: &SessionId) -> Option<ExpectedOutput> {
        self.artifacts.record(session).map(|record| ExpectedOutput {
            filename: record.filename,
            path: record.path,
            state: record.state,
        })
    }
}
