//! Teardown of per-session working state.
//!
//! The cleaner runs after every merge attempt regardless of its outcome. It
//! removes each stored file, then the working directory, and finally closes
//! the session. Failures are logged and counted, never returned: a cleanup
//! problem must not replace the merge result the caller is waiting for.
//!
//! Merged artifacts live beside the session directories, not inside them,
//! so they are out of the cleaner's reach.

use std::path::{Path, PathBuf};
use tokio::task;
use walkdir::WalkDir;

use super::Session;

/// What a cleanup pass managed to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files deleted.
    pub files_removed: usize,

    /// Directories deleted, including the working directory itself.
    pub dirs_removed: usize,

    /// Paths that could not be deleted.
    pub failures: Vec<PathBuf>,
}

impl CleanupReport {
    /// Whether every entry was removed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Removes session working directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCleaner;

impl SessionCleaner {
    /// Create a cleaner.
    pub fn new() -> Self {
        Self
    }

    /// Remove the session's files and working directory, then close it.
    ///
    /// The session is closed even when removal fails.
    pub async fn clean(&self, session: &mut Session) -> CleanupReport {
        let dir = session.dir().clone();
        session.close();

        let report = match task::spawn_blocking(move || remove_tree(&dir)).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(session = %session.id(), error = %e, "cleanup task failed");
                CleanupReport {
                    failures: vec![session.dir().clone()],
                    ..Default::default()
                }
            }
        };

        if report.is_clean() {
            tracing::debug!(
                session = %session.id(),
                files = report.files_removed,
                dirs = report.dirs_removed,
                "removed session working directory"
            );
        } else {
            tracing::warn!(
                session = %session.id(),
                failed = report.failures.len(),
                "unable to delete all session files"
            );
        }

        report
    }
}

/// Delete `dir` bottom-up, continuing past individual failures.
fn remove_tree(dir: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();

    if !dir.exists() {
        return report;
    }

    for entry in WalkDir::new(dir).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "unable to walk session directory");
                report
                    .failures
                    .push(e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()));
                continue;
            }
        };

        let path = entry.path();
        let removed = if entry.file_type().is_dir() {
            std::fs::remove_dir(path).map(|_| report.dirs_removed += 1)
        } else {
            std::fs::remove_file(path).map(|_| report.files_removed += 1)
        };

        if let Err(e) = removed {
            tracing::warn!(path = %path.display(), error = %e, "unable to delete");
            report.failures.push(path.to_path_buf());
        }
    }

    report
}
