//! [`SessionRegistry`]: the single-lock, ordered collection of live sessions.

use std::os::unix::io::RawFd;
use std::sync::Mutex;

use ftp_core::{FtpError, Session};

/// A concurrent ordered collection of [`Session`]s, keyed by `control_fd`.
///
/// A single mutex serializes every mutation; [`SessionRegistry::lookup`]
/// returns a clone so callers never hold a reference across a scheduling
/// point. Lookup also honors a relaxed match: a session matches a queried
/// descriptor if it equals either its `control_fd` or its `listen_fd`, so
/// the reactor can find a session from either a control or a
/// passive-listen readiness event.
pub struct SessionRegistry {
    sessions: Mutex<Vec<Session>>,
}

impl SessionRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Inserts `session`, rejecting duplicates of its `control_fd`.
    ///
    /// # Errors
    ///
    /// Returns [`FtpError::Fatal`] if a session with the same `control_fd`
    /// is already registered.
    pub fn insert(&self, session: Session) -> Result<(), FtpError> {
        let mut sessions = self.lock();
        if sessions.iter().any(|s| s.control_fd == session.control_fd) {
            return Err(FtpError::Fatal(format!(
                "duplicate session for control_fd {}",
                session.control_fd
            )));
        }
        sessions.push(session);
        Ok(())
    }

    /// Returns a clone of the session matching `fd` against either `control_fd` or `listen_fd`.
    ///
    /// # Errors
    ///
    /// Returns [`FtpError::SessionMissing`] if no session matches.
    pub fn lookup(&self, fd: RawFd) -> Result<Session, FtpError> {
        self.lock()
            .iter()
            .find(|s| s.control_fd == fd || s.listen_fd == Some(fd))
            .cloned()
            .ok_or(FtpError::SessionMissing(fd))
    }

    /// Atomically replaces the session keyed by `control_fd` with `updated`.
    ///
    /// # Errors
    ///
    /// Returns [`FtpError::SessionMissing`] and leaves the registry
    /// unchanged if no session with that `control_fd` exists.
    pub fn replace(&self, control_fd: RawFd, updated: Session) -> Result<Session, FtpError> {
        let mut sessions = self.lock();
        let slot = sessions
            .iter_mut()
            .find(|s| s.control_fd == control_fd)
            .ok_or(FtpError::SessionMissing(control_fd))?;
        Ok(std::mem::replace(slot, updated))
    }

    /// Removes and returns the session keyed by `control_fd`, closing its
    /// descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`FtpError::SessionMissing`] if no session with that
    /// `control_fd` exists.
    pub fn remove(&self, control_fd: RawFd) -> Result<Session, FtpError> {
        let mut sessions = self.lock();
        let index = sessions
            .iter()
            .position(|s| s.control_fd == control_fd)
            .ok_or(FtpError::SessionMissing(control_fd))?;
        let session = sessions.remove(index);
        close_session_descriptors(&session);
        Ok(session)
    }

    /// Returns the number of registered sessions.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Returns a clone of the session at position `index`, if any.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<Session> {
        self.lock().get(index).cloned()
    }

    /// Returns clones of every passive-mode session whose `listen_fd` is
    /// open, for the reactor's wake-up scan.
    #[must_use]
    pub fn passive_listeners(&self) -> Vec<Session> {
        self.lock()
            .iter()
            .filter(|s| s.listen_fd.is_some())
            .cloned()
            .collect()
    }

    /// Removes every session, closing all remaining descriptors.
    ///
    /// Called once during reactor shutdown.
    pub fn clear(&self) {
        let mut sessions = self.lock();
        for session in sessions.drain(..) {
            close_session_descriptors(&session);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn close_session_descriptors(session: &Session) {
    close_fd(session.control_fd);
    if let Some(fd) = session.data_fd {
        close_fd(fd);
    }
    if let Some(fd) = session.listen_fd {
        close_fd(fd);
    }
}

fn close_fd(fd: RawFd) {
    // SAFETY: `fd` is owned by a `Session` we are destroying and is not
    // used again after this call.
    #[allow(unsafe_code)]
    unsafe {
        libc::close(fd);
    }
}
