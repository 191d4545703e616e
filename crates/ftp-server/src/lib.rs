#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `ftp-server` is the concurrency and protocol-dispatch layer: the
//! [`registry::SessionRegistry`], the [`worker_pool::WorkerPool`], the
//! [`command`] parser, [`data_channel`] negotiation, the per-verb
//! [`handlers`], and the [`reactor::Reactor`] that ties them together into
//! a running daemon.
//!
//! # Design
//!
//! One reactor thread owns the `epoll` instance and the control-port
//! listen socket; it never blocks on anything but `epoll_wait`. Every
//! command that might block — reading a request, touching the
//! filesystem, streaming a transfer — runs on a worker thread pulled from
//! the [`worker_pool::WorkerPool`]. The two communicate only through the
//! [`registry::SessionRegistry`] and the reactor's `eventfd` wake-up
//! descriptor; there is no other shared mutable state.
//!
//! # Invariants
//!
//! - A session's `control_fd` is registered one-shot; the reactor never
//!   re-arms it until the worker handling the in-flight request finishes,
//!   so two requests on one session never run concurrently.
//! - `SIGINT` is unblocked only on the reactor thread; every worker thread
//!   masks it so the signal always reaches the reactor's handler.
//!
//! # Errors
//!
//! [`run`] returns [`error::ServerError`] for any setup failure (bind,
//! `epoll_create1`, `eventfd`, signal installation). Once running, handler
//! and framing errors are caught, logged, and translated into reply codes
//! rather than propagated — see [`error::reply_for_error`].

mod command;
/// ACTIVE/PASSIVE data-connection negotiation.
pub mod data_channel;
/// Handler-level error kinds and their mapping onto reply codes.
pub mod error;
/// Per-verb command handlers, dispatched by [`handlers::dispatch`].
pub mod handlers;
/// The epoll-driven reactor main loop.
pub mod reactor;
/// The single-lock, ordered [`registry::SessionRegistry`] of live sessions.
pub mod registry;
/// The fixed-size [`worker_pool::WorkerPool`] draining the task queue.
pub mod worker_pool;

use std::sync::Arc;

use ftp_core::ServerConfig;
use logging_sink::LogSink;

pub use error::ServerError;
pub use reactor::Reactor;

/// Builds and runs a reactor bound to `config.control_port` until `SIGINT`.
///
/// # Errors
///
/// Returns [`ServerError`] if any setup syscall fails.
pub fn run(config: ServerConfig, log: LogSink) -> Result<(), ServerError> {
    let reactor = Reactor::bind(Arc::new(config), log)?;
    reactor.run()
}
