//! Handler-level errors and their mapping onto reply codes.

use std::io::ErrorKind;

use ftp_core::FtpError;
use ftp_protocol::FramingError;

/// Failure raised by a command handler or the reactor's dispatch loop.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Propagated from `ftp-core` (path rejection, filesystem error, session lookup).
    #[error(transparent)]
    Core(#[from] FtpError),

    /// Propagated from `ftp-protocol` (framing failure on control or data descriptor).
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// A syscall (socket, bind, listen, accept, epoll, fork, pipe, ...) failed.
    #[error("syscall failed: {0}")]
    Syscall(#[source] std::io::Error),

    /// Opening an ACTIVE or PASSIVE data-connection socket failed (bind,
    /// connect, or no local interface would accept a listener).
    #[error("failed to open data connection: {0}")]
    DataChannelUnavailable(#[source] std::io::Error),

    /// The command verb was not in the closed set the parser recognizes.
    #[error("unrecognized command")]
    UnknownCommand,

    /// A command argument was missing or malformed for the verb given.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A transfer command ran with no data connection available: PASSIVE
    /// mode with no pending listener, or no mode selected at all.
    #[error("no data connection available")]
    NoDataConnection,

    /// The server observed `SIGINT` while this transfer was still running.
    #[error("server is shutting down")]
    ShutdownInProgress,
}

/// Maps a [`ServerError`] onto the `(code, body)` pair a handler replies with.
///
/// Unrecognized or ambiguous failures default to 451 (local processing
/// error) rather than silently succeeding.
#[must_use]
pub fn reply_for_error(err: &ServerError) -> (u16, String) {
    use ftp_core::constants::{
        REPLY_CANNOT_OPEN_DATA_CONN, REPLY_CONN_CLOSED_TRANSFER_ABORTED, REPLY_FILE_NOT_FOUND,
        REPLY_FILE_UNAVAILABLE, REPLY_LOCAL_PROCESS_ERROR, REPLY_PARAM_SYNTAX_ERROR,
        REPLY_SYNTAX_ERROR,
    };

    match err {
        ServerError::Core(FtpError::PathRejected(reason)) => {
            (REPLY_PARAM_SYNTAX_ERROR, reason.clone())
        }
        ServerError::Core(FtpError::FileSystemError { source, .. }) => {
            match source.kind() {
                std::io::ErrorKind::NotFound => {
                    (REPLY_FILE_NOT_FOUND, "file or directory not found".to_string())
                }
                _ => (REPLY_FILE_UNAVAILABLE, source.to_string()),
            }
        }
        ServerError::Core(FtpError::SessionMissing(_)) => {
            (REPLY_FILE_NOT_FOUND, "session not found".to_string())
        }
        ServerError::Framing(FramingError::UnexpectedEof) => (
            REPLY_CONN_CLOSED_TRANSFER_ABORTED,
            "data connection closed mid-transfer".to_string(),
        ),
        ServerError::Framing(FramingError::Io(io_err))
            if matches!(
                io_err.kind(),
                ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
            ) =>
        {
            (
                REPLY_CONN_CLOSED_TRANSFER_ABORTED,
                "data connection closed mid-transfer".to_string(),
            )
        }
        ServerError::Core(_) | ServerError::Syscall(_) | ServerError::Framing(_) => {
            (REPLY_LOCAL_PROCESS_ERROR, err.to_string())
        }
        ServerError::DataChannelUnavailable(_) => (REPLY_CANNOT_OPEN_DATA_CONN, err.to_string()),
        ServerError::UnknownCommand => (REPLY_SYNTAX_ERROR, "unrecognized command".to_string()),
        ServerError::InvalidArgument(reason) => (REPLY_PARAM_SYNTAX_ERROR, reason.clone()),
        ServerError::NoDataConnection => (
            REPLY_CONN_CLOSED_TRANSFER_ABORTED,
            "no data connection available".to_string(),
        ),
        ServerError::ShutdownInProgress => {
            (REPLY_FILE_UNAVAILABLE, "server is shutting down".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_rejected_maps_to_param_syntax_error() {
        let err = ServerError::Core(FtpError::PathRejected("bad path".to_string()));
        let (code, body) = reply_for_error(&err);
        assert_eq!(code, 501);
        assert_eq!(body, "bad path");
    }

    #[test]
    fn missing_file_maps_to_file_not_found() {
        let io_err = std::io::Error::from(std::io::ErrorKind::NotFound);
        let err = ServerError::Core(FtpError::fs("x.txt", io_err));
        let (code, _) = reply_for_error(&err);
        assert_eq!(code, 550);
    }

    #[test]
    fn unknown_command_maps_to_syntax_error() {
        let (code, _) = reply_for_error(&ServerError::UnknownCommand);
        assert_eq!(code, 500);
    }

    #[test]
    fn no_data_connection_maps_to_connection_closed() {
        let (code, _) = reply_for_error(&ServerError::NoDataConnection);
        assert_eq!(code, 426);
    }

    #[test]
    fn data_channel_unavailable_maps_to_cannot_open_data_conn() {
        let err = ServerError::DataChannelUnavailable(std::io::Error::other("no route"));
        let (code, _) = reply_for_error(&err);
        assert_eq!(code, 425);
    }

    #[test]
    fn broken_pipe_on_data_channel_maps_to_connection_closed() {
        let err = ServerError::Framing(FramingError::Io(std::io::Error::from(
            ErrorKind::BrokenPipe,
        )));
        let (code, _) = reply_for_error(&err);
        assert_eq!(code, 426);
    }

    #[test]
    fn unexpected_eof_on_data_channel_maps_to_connection_closed() {
        let (code, _) = reply_for_error(&ServerError::Framing(FramingError::UnexpectedEof));
        assert_eq!(code, 426);
    }

    #[test]
    fn shutdown_in_progress_maps_to_file_unavailable() {
        let (code, _) = reply_for_error(&ServerError::ShutdownInProgress);
        assert_eq!(code, 450);
    }

    #[test]
    fn other_io_error_kinds_fall_back_to_local_process_error() {
        let err = ServerError::Framing(FramingError::Io(std::io::Error::from(
            ErrorKind::PermissionDenied,
        )));
        let (code, _) = reply_for_error(&err);
        assert_eq!(code, 451);
    }
}
