//! Session file storage.
//!
//! The [`FileStore`] gives every session its own working directory under the
//! storage root, copies validated uploads into it and keeps the ordered list
//! of stored files in the [`SessionRegistry`].
//!
//! Layout on disk:
//!
//! ```text
//! <root>/
//!   <session-id>/            working directory, removed after the merge
//!     report.pdf
//!     appendix.pdf
//!   <session-id>-report_and_appendix_merged.pdf   artifact, removed on delivery
//! ```

mod upload;

pub use upload::Upload;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{self, AsyncRead, AsyncWriteExt};

use crate::error::{MergerError, Result};
use crate::session::{SessionHandle, SessionId, SessionRegistry, StoredFile};
use crate::validation::UploadValidator;

/// Per-session storage of uploaded files.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    validator: UploadValidator,
    registry: SessionRegistry,
}

impl FileStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, validator: UploadValidator) -> Self {
        Self {
            root: root.into(),
            validator,
            registry: SessionRegistry::new(),
        }
    }

    /// Storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Live sessions.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Working directory of a session.
    pub fn session_dir(&self, id: &SessionId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Create the storage root. Safe to call repeatedly.
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| MergerError::storage(&self.root, e))?;
        tracing::info!(root = %self.root.display(), "storage initialized");
        Ok(())
    }

    /// Register a session and create its working directory.
    ///
    /// Idempotent: later calls for the same id return the same session.
    ///
    /// # Errors
    ///
    /// - [`MergerError::SessionClosed`] if the session was already merged
    /// - [`MergerError::StorageIo`] if the directory cannot be created
    pub async fn open_session(&self, id: &SessionId) -> Result<SessionHandle> {
        let (handle, created) = self.registry.get_or_insert(id, || self.session_dir(id));

        {
            let session = handle.lock().await;
            if session.is_closed() {
                return Err(MergerError::session_closed(id));
            }
            fs::create_dir_all(session.dir())
                .await
                .map_err(|e| MergerError::storage(session.dir(), e))?;
        }

        if created {
            tracing::debug!(session = %id, "opened session");
        }
        Ok(handle)
    }

    /// Validate an upload and copy it into the session.
    ///
    /// The file lands at `<working dir>/<filename>`, replacing any earlier
    /// file of the same name, and is appended to the session's list. A
    /// rejected upload leaves the list untouched; the session and its
    /// directory stay in place for further uploads.
    ///
    /// # Errors
    ///
    /// - [`MergerError::InvalidFormat`], [`MergerError::EmptyContent`],
    ///   [`MergerError::PathTraversal`] on rejection
    /// - [`MergerError::SessionClosed`] if the session was already merged
    /// - [`MergerError::StorageIo`] if the bytes cannot be written
    pub async fn admit<R>(&self, id: &SessionId, upload: Upload<R>) -> Result<StoredFile>
    where
        R: AsyncRead + Unpin,
    {
        let handle = self.open_session(id).await?;
        let mut session = handle.lock().await;
        if session.is_closed() {
            return Err(MergerError::session_closed(id));
        }

        let (filename, len, mut content) = upload.into_parts();
        if let Err(e) = self.validator.validate(&filename, len) {
            tracing::warn!(session = %id, file = %filename, error = %e, "rejected upload");
            return Err(e);
        }

        let path = session.dir().join(&filename);
        if path.parent() != Some(session.dir().as_path()) {
            return Err(MergerError::PathTraversal { filename });
        }

        let size = match write_stream(&path, &mut content).await {
            Ok(0) => {
                discard_partial(&path).await;
                tracing::warn!(session = %id, file = %filename, "upload stream was empty");
                return Err(MergerError::EmptyContent { filename });
            }
            Ok(size) => size,
            Err(e) => {
                discard_partial(&path).await;
                return Err(MergerError::storage(&path, e));
            }
        };

        let stored = StoredFile {
            filename,
            path,
            size,
        };
        tracing::info!(
            session = %id,
            file = %stored.filename,
            size,
            position = session.files().len() + 1,
            "stored upload"
        );
        session.push(stored.clone());

        Ok(stored)
    }

    /// Files of a session in merge order; empty for unknown sessions.
    pub async fn files_for(&self, id: &SessionId) -> Vec<StoredFile> {
        match self.registry.get(id) {
            Some(handle) => handle.lock().await.files().to_vec(),
            None => Vec::new(),
        }
    }

    /// Number of files admitted to a session; zero for unknown sessions.
    pub async fn file_count(&self, id: &SessionId) -> usize {
        match self.registry.get(id) {
            Some(handle) => handle.lock().await.files().len(),
            None => 0,
        }
    }

    /// Rearrange a session's files to the caller's order.
    ///
    /// `order` lists filenames and must be a permutation of the admitted
    /// filenames (duplicates included). Nothing changes on mismatch.
    ///
    /// # Errors
    ///
    /// - [`MergerError::InvalidOrder`] if `order` doesn't match the uploads
    /// - [`MergerError::SessionClosed`] if the session was already merged
    pub async fn reorder(&self, id: &SessionId, order: &[String]) -> Result<Vec<StoredFile>> {
        let Some(handle) = self.registry.get(id) else {
            return if order.is_empty() {
                Ok(Vec::new())
            } else {
                Err(MergerError::invalid_order(format!(
                    "session {id} has no uploaded files"
                )))
            };
        };

        let mut session = handle.lock().await;
        if session.is_closed() {
            return Err(MergerError::session_closed(id));
        }

        let reordered = arrange(session.files(), order)?;
        session.replace_files(reordered.clone());
        tracing::debug!(session = %id, order = ?order, "reordered session files");
        Ok(reordered)
    }

    /// Look up a live session.
    pub fn session(&self, id: &SessionId) -> Option<SessionHandle> {
        self.registry.get(id)
    }

    /// Drop a session from the registry.
    pub fn forget(&self, id: &SessionId) -> Option<SessionHandle> {
        self.registry.remove(id)
    }
}

async fn write_stream<R>(path: &Path, content: &mut R) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut file = File::create(path).await?;
    let size = io::copy(content, &mut file).await?;
    file.flush().await?;
    Ok(size)
}

async fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "unable to remove partial upload");
    }
}

/// Order `files` by `order`, matching each name to one unused stored file.
fn arrange(files: &[StoredFile], order: &[String]) -> Result<Vec<StoredFile>> {
    let mut pool: HashMap<&str, Vec<&StoredFile>> = HashMap::new();
    for file in files.iter().rev() {
        pool.entry(file.filename.as_str()).or_default().push(file);
    }

    let mut arranged = Vec::with_capacity(files.len());
    let mut unknown = Vec::new();
    for name in order {
        match pool.get_mut(name.as_str()).and_then(Vec::pop) {
            Some(file) => arranged.push(file.clone()),
            None => unknown.push(name.as_str()),
        }
    }

    let mut missing: Vec<&str> = pool
        .iter()
        .flat_map(|(name, left)| std::iter::repeat_n(*name, left.len()))
        .collect();
    missing.sort_unstable();

    if unknown.is_empty() && missing.is_empty() {
        return Ok(arranged);
    }

    let mut details = Vec::new();
    if !unknown.is_empty() {
        details.push(format!("not uploaded: {}", unknown.join(", ")));
    }
    if !missing.is_empty() {
        details.push(format!("not ordered: {}", missing.join(", ")));
    }
    Err(MergerError::invalid_order(details.join("; ")))
}
