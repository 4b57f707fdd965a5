//! Per-session cooperative cancellation registry
//!
//! The operation that starts session-scoped work registers the session and
//! holds the returned [`SessionRun`] for as long as the work runs; dropping
//! the guard removes the registration. Anyone may call [`SessionLock::abort`]
//! to signal the registered token.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, RuntimeError};
use crate::types::identifiers::SessionId;

struct Entry {
    generation: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct Inner {
    next_generation: AtomicU64,
    entries: Mutex<HashMap<SessionId, Entry>>,
}

/// Registry mapping session ids to live cancellation tokens
#[derive(Clone, Default)]
pub struct SessionLock {
    inner: Arc<Inner>,
}

impl SessionLock {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and get its run guard
    ///
    /// A previous registration whose token was already cancelled is replaced.
    ///
    /// # Errors
    /// Returns error if the session already has a live registration
    pub fn acquire(&self, session_id: &SessionId) -> Result<SessionRun> {
        let mut entries = self.inner.entries.lock();
        if let Some(existing) = entries.get(session_id)
            && !existing.token.is_cancelled()
        {
            return Err(RuntimeError::session(format!(
                "Session {session_id} already has an active run"
            )));
        }
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();
        entries.insert(
            session_id.clone(),
            Entry {
                generation,
                token: token.clone(),
            },
        );
        log::debug!("Session {} registered for cancellation", session_id);
        Ok(SessionRun {
            lock: Arc::clone(&self.inner),
            session_id: session_id.clone(),
            generation,
            token,
        })
    }

    /// Signal cancellation for a session
    ///
    /// Unknown or already aborted sessions are a no-op. Returns true when a
    /// live token was signalled by this call.
    pub fn abort(&self, session_id: &SessionId) -> bool {
        let entries = self.inner.entries.lock();
        match entries.get(session_id) {
            Some(entry) if !entry.token.is_cancelled() => {
                log::info!("Abort requested for session {}", session_id);
                entry.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Signal every registered session; returns how many were live
    pub fn abort_all(&self) -> usize {
        let entries = self.inner.entries.lock();
        let mut signalled = 0;
        for entry in entries.values() {
            if !entry.token.is_cancelled() {
                entry.token.cancel();
                signalled += 1;
            }
        }
        signalled
    }

    /// Token registered for a session, if any
    #[must_use]
    pub fn token(&self, session_id: &SessionId) -> Option<CancellationToken> {
        self.inner
            .entries
            .lock()
            .get(session_id)
            .map(|entry| entry.token.clone())
    }

    /// True when the session is registered and its token was cancelled
    #[must_use]
    pub fn is_aborted(&self, session_id: &SessionId) -> bool {
        self.inner
            .entries
            .lock()
            .get(session_id)
            .is_some_and(|entry| entry.token.is_cancelled())
    }

    /// True when the session has a registration
    #[must_use]
    pub fn is_registered(&self, session_id: &SessionId) -> bool {
        self.inner.entries.lock().contains_key(session_id)
    }

    /// Number of registered sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// True when nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Guard for one session-scoped run
///
/// Dropping it removes the registration, unless a newer run replaced it.
pub struct SessionRun {
    lock: Arc<Inner>,
    session_id: SessionId,
    generation: u64,
    token: CancellationToken,
}

impl SessionRun {
    /// Session this run belongs to
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Cancellation token to pass into session-scoped operations
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once the session was aborted
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for SessionRun {
    fn drop(&mut self) {
        let mut entries = self.lock.entries.lock();
        if entries
            .get(&self.session_id)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            entries.remove(&self.session_id);
            log::debug!("Session {} released", self.session_id);
        }
    }
}

impl std::fmt::Debug for SessionRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRun")
            .field("session_id", &self.session_id)
            .field("generation", &self.generation)
            .field("aborted", &self.is_aborted())
            .finish()
    }
}
