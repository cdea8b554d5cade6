//! Concurrent arena of live sessions keyed by id.
//!
//! The map lock is only held for insert/lookup/remove. Work on a session
//! (copying bytes, running the merge tool) happens under that session's own
//! async mutex, so unrelated sessions never wait on each other.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Session, SessionId};

/// Shared, lockable handle to one session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Source of truth for which files belong to which in-flight merge.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session, creating it with working directory `dir` if absent.
    ///
    /// Returns the handle and whether it was created by this call.
    pub fn get_or_insert(&self, id: &SessionId, dir: impl FnOnce() -> PathBuf) -> (SessionHandle, bool) {
        if let Some(handle) = self.get(id) {
            return (handle, false);
        }

        let mut sessions = self.sessions.write();
        // Another caller may have won the race between the read and write lock.
        if let Some(handle) = sessions.get(id) {
            return (Arc::clone(handle), false);
        }

        let handle = Arc::new(Mutex::new(Session::new(id.clone(), dir())));
        sessions.insert(id.clone(), Arc::clone(&handle));
        (handle, true)
    }

    /// Look up a session.
    pub fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove a session, returning its handle if it was present.
    pub fn remove(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions.write().remove(id)
    }

    /// Whether a session is registered.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
