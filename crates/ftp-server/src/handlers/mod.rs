//! Command handlers: one module per FTP verb, dispatched from [`dispatch`].
//!
//! Every handler looks its [`ftp_core::Session`] up by `control_fd`,
//! performs its effect, writes the session back to the registry if it
//! changed, and returns the `(code, body)` pair the caller frames as a
//! [`ftp_protocol::Reply`]. Handlers never send the reply themselves — the
//! reactor's dispatch task owns the control descriptor for the duration of
//! one request/reply cycle.

mod cwd;
mod dele;
mod list;
mod mkd;
mod pasv;
mod port;
mod pwd;
mod retr;
mod rmd;
mod stor;

use std::os::unix::io::RawFd;
use std::sync::Arc;

use ftp_core::ServerConfig;
use logging_sink::LogSink;

use crate::command::Command;
use crate::error::{reply_for_error, ServerError};
use crate::registry::SessionRegistry;

/// Shared, read-mostly handles every handler needs: the registry, the
/// validated config, the reactor's epoll/wake descriptors, and the log sink.
pub struct HandlerContext {
    /// The single session registry shared by the reactor and every worker.
    pub registry: Arc<SessionRegistry>,
    /// Validated startup configuration (root directory, transfer cap, ...).
    pub config: Arc<ServerConfig>,
    /// The reactor's epoll instance, for handlers that register new descriptors.
    pub epoll_fd: RawFd,
    /// The reactor's wake-up (`eventfd`) descriptor, written to notify it of new PASSIVE listeners.
    pub wake_fd: RawFd,
    /// The shared log sink.
    pub log: LogSink,
}

/// Greets a newly accepted session. Always succeeds.
#[must_use]
pub fn greet() -> (u16, String) {
    (200, "ftpd ready".to_string())
}

/// Dispatches `command` against the session keyed by `control_fd`, returning
/// the `(code, body)` pair to frame as a reply.
///
/// A handler error is translated via [`reply_for_error`] rather than
/// propagated, so the caller can always send a reply regardless of outcome.
#[must_use]
pub fn dispatch(ctx: &HandlerContext, control_fd: RawFd, command: Command) -> (u16, String) {
    let outcome = match command {
        Command::Pwd => pwd::handle(ctx, control_fd),
        Command::Cwd(arg) => cwd::handle(ctx, control_fd, &arg),
        Command::Mkd(arg) => mkd::handle(ctx, control_fd, &arg),
        Command::Rmd(arg) => rmd::handle(ctx, control_fd, &arg),
        Command::Dele(arg) => dele::handle(ctx, control_fd, &arg),
        Command::Port(arg) => port::handle(ctx, control_fd, &arg),
        Command::Pasv => pasv::handle(ctx, control_fd),
        Command::List(arg) => list::handle(ctx, control_fd, &arg),
        Command::Retr(arg) => retr::handle(ctx, control_fd, &arg),
        Command::Stor(arg) => stor::handle(ctx, control_fd, &arg),
        Command::Quit => quit_handle(ctx, control_fd),
        Command::Unknown => Err(ServerError::UnknownCommand),
    };

    match outcome {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(control_fd, error = %err, "command failed");
            reply_for_error(&err)
        }
    }
}

fn quit_handle(ctx: &HandlerContext, control_fd: RawFd) -> Result<(u16, String), ServerError> {
    ctx.registry.lookup(control_fd)?;
    Ok((221, "goodbye".to_string()))
}

/// Closes whichever data descriptor(s) a session already holds before
/// `PORT`/`PASV` installs a new one: an open `data_fd` (dialed or promoted
/// from a prior listener), and/or a still-pending `listen_fd` from an
/// earlier `PASV` that was never connected to. At most one of the two is
/// ever set, but closing both unconditionally means neither handler has to
/// know which mode the session was previously in.
pub(super) fn close_existing_data_channel(session: &mut ftp_core::Session) {
    #[allow(unsafe_code)]
    if let Some(fd) = session.data_fd.take() {
        unsafe {
            libc::close(fd);
        }
    }
    #[allow(unsafe_code)]
    if let Some(fd) = session.listen_fd.take() {
        unsafe {
            libc::close(fd);
        }
    }
}


/// Shared handler-test scaffolding: a [`HandlerContext`] over a throwaway registry.
#[cfg(test)]
pub(crate) mod test_support {
    use super::HandlerContext;
    use crate::registry::SessionRegistry;
    use ftp_core::ServerConfig;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    pub(crate) fn context(root: &Path) -> HandlerContext {
        HandlerContext {
            registry: Arc::new(SessionRegistry::new()),
            config: Arc::new(config(root)),
            epoll_fd: -1,
            wake_fd: -1,
            log: logging_sink::LogSink::stdout(),
        }
    }

    pub(crate) fn config(root: &Path) -> ServerConfig {
        ServerConfig {
            log_file: None,
            threads_number: 1,
            control_port: 0,
            data_port: 0,
            connection_queue_size: 1,
            root_directory: root.to_path_buf(),
            max_transfer_bytes: None,
            log_level: "info".to_string(),
        }
    }

    pub(crate) fn root_arc(root: &Path) -> Arc<PathBuf> {
        Arc::new(root.to_path_buf())
    }
}
