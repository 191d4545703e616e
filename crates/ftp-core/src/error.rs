//! Error kinds shared across the framing, session, and handler layers.

use std::io;
use std::path::PathBuf;

/// Top-level error kind propagated from framing up through command handlers.
///
/// Every non-[`Fatal`](FtpError::Fatal) variant is handled locally by the
/// caller: logged, translated into the appropriate reply code, and
/// swallowed. [`Fatal`](FtpError::Fatal) closes the offending session's
/// descriptors and removes it from the registry, but never aborts the
/// process outright (see `Reactor` in `ftp-server`).
#[derive(Debug, thiserror::Error)]
pub enum FtpError {
    /// A framing primitive was called with a missing buffer or a negative descriptor.
    #[error("invalid arguments: {0}")]
    InvalidArgs(&'static str),

    /// A framed header declared a length exceeding the message kind's maximum.
    #[error("frame length {len} exceeds the maximum of {max}")]
    InvalidLength {
        /// Length declared in the wire header.
        len: usize,
        /// Maximum permitted for this message kind.
        max: usize,
    },

    /// A send or receive loop failed in a way that is not recoverable.
    #[error("transmission failure: {0}")]
    TransmissionFailure(#[source] io::Error),

    /// A client-supplied path failed [`crate::path::validate_relative_path`].
    #[error("path rejected: {0}")]
    PathRejected(String),

    /// An underlying filesystem syscall failed.
    #[error("filesystem error on {path}: {source}")]
    FileSystemError {
        /// Path the failing operation targeted.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Socket creation, bind, listen, or connect failed.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(#[source] io::Error),

    /// The session registry had no entry for a descriptor the caller expected to find.
    #[error("no session registered for descriptor {0}")]
    SessionMissing(i32),

    /// Unrecoverable condition; the affected session is torn down but the server keeps running.
    #[error("fatal session error: {0}")]
    Fatal(String),
}

impl FtpError {
    /// Wraps an [`io::Error`] encountered while operating on `path` as a [`FileSystemError`](Self::FileSystemError).
    pub fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileSystemError {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error should tear down the session rather than
    /// simply be reported back to the peer on the control channel.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_report_is_fatal() {
        let err = FtpError::Fatal("registry corrupted".to_string());
        assert!(err.is_fatal());
    }

    #[test]
    fn non_fatal_errors_report_not_fatal() {
        let err = FtpError::SessionMissing(7);
        assert!(!err.is_fatal());
    }

    #[test]
    fn display_includes_descriptor_for_session_missing() {
        let err = FtpError::SessionMissing(42);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn display_includes_both_lengths_for_invalid_length() {
        let err = FtpError::InvalidLength { len: 9000, max: 512 };
        let rendered = err.to_string();
        assert!(rendered.contains("9000"));
        assert!(rendered.contains("512"));
    }
}
