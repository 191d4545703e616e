//! The per-client [`Session`] record and its [`DataMode`].

use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::path::normalize_curr_dir;

/// Which of the two data-connection negotiation strategies a session is using.
///
/// A session starts with no data connection at all; the first `PORT` or
/// `PASV` command picks a mode, and every subsequent `PORT`/`PASV` may
/// switch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    /// The server connects outward to an address the peer advertised via `PORT`.
    Active,
    /// The server listens locally and waits for the peer to connect, per `PASV`.
    Passive,
}

/// Per-client state owned by the session registry and uniquely identified by
/// [`control_fd`](Session::control_fd).
///
/// Invariant: at most one of [`data_fd`](Session::data_fd) and
/// [`listen_fd`](Session::listen_fd) is `Some` at any instant — enforced by
/// every method that changes either field, not just by convention.
#[derive(Debug, Clone)]
pub struct Session {
    /// Stream descriptor used for command/reply exchange.
    pub control_fd: RawFd,
    /// Current data-transfer descriptor, if a data connection is established.
    pub data_fd: Option<RawFd>,
    /// Passive listening descriptor, if a `PASV` listener is pending a connect.
    pub listen_fd: Option<RawFd>,
    /// Which negotiation strategy is currently selected.
    pub data_mode: Option<DataMode>,
    /// Textual peer address, captured at accept time.
    pub peer_ip: String,
    /// Textual peer port, captured at accept time.
    pub peer_port: String,
    /// Address the peer last advertised via `PORT`, used to (re)open ACTIVE data connections.
    pub peer_data_addr: Option<(String, String)>,
    /// Configured server root; shared and immutable for the process lifetime.
    pub root_dir: Arc<PathBuf>,
    /// Current working directory, relative to `root_dir`. Always slash-normalized,
    /// never begins with `/`, never contains a `..` segment.
    pub curr_dir: String,
}

impl Session {
    /// Constructs a freshly accepted session with no data connection and
    /// `curr_dir` set to the server root.
    #[must_use]
    pub fn new(
        control_fd: RawFd,
        peer_ip: impl Into<String>,
        peer_port: impl Into<String>,
        root_dir: Arc<PathBuf>,
    ) -> Self {
        Self {
            control_fd,
            data_fd: None,
            listen_fd: None,
            data_mode: None,
            peer_ip: peer_ip.into(),
            peer_port: peer_port.into(),
            peer_data_addr: None,
            root_dir,
            curr_dir: String::new(),
        }
    }

    /// Returns `root_dir` joined with `curr_dir`.
    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        if self.curr_dir.is_empty() {
            self.root_dir.as_path().to_path_buf()
        } else {
            self.root_dir.join(&self.curr_dir)
        }
    }

    /// Resolves `segment` relative to [`current_path`](Self::current_path).
    #[must_use]
    pub fn resolve(&self, segment: &str) -> PathBuf {
        self.current_path().join(segment)
    }

    /// Updates `curr_dir` to `new_curr_dir` after normalizing it.
    ///
    /// Callers are responsible for verifying the resulting path resolves to
    /// a real directory before calling this.
    pub fn set_curr_dir(&mut self, new_curr_dir: &str) {
        self.curr_dir = normalize_curr_dir(new_curr_dir);
    }

    /// Returns `true` if neither a data connection nor a pending passive
    /// listener is installed.
    #[must_use]
    pub const fn has_no_data_channel(&self) -> bool {
        self.data_fd.is_none() && self.listen_fd.is_none()
    }

    /// Displays the full printable path: `<root_dir>/<curr_dir>`.
    #[must_use]
    pub fn printable_path(&self) -> String {
        let root = self.root_dir.display();
        if self.curr_dir.is_empty() {
            format!("{root}")
        } else {
            format!("{root}/{curr}", curr = self.curr_dir)
        }
    }
}

/// Returns the descriptor a session should be looked up by when `fd` is
/// observed readable by the reactor.
///
/// A session matches if `fd` equals either its `control_fd` or its `listen_fd`.
#[must_use]
pub fn matches_fd(session: &Session, fd: RawFd) -> bool {
    session.control_fd == fd || session.listen_fd == Some(fd)
}

/// Returns `true` if `path` is a real, accessible directory.
#[must_use]
pub fn is_directory(path: &Path) -> bool {
    path.is_dir()
}
