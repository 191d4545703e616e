#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `ftp-core` holds the data shared by every other crate in this workspace:
//! the [`Session`] record, the reply-code and framing-size constants, the
//! path validator handlers apply before touching the filesystem, the typed
//! error kinds propagated from framing up through handlers, and the
//! properties-file loader used to build a [`ServerConfig`] at startup.
//!
//! # Design
//!
//! Nothing in this crate depends on sockets or threads: [`session`] models
//! state, [`path`] validates strings, [`config`] turns a `key=value` file
//! into a [`ServerConfig`], and [`error`] defines the kinds propagated by
//! the protocol and server crates. Keeping this crate free of I/O beyond a
//! single file read makes it cheap to unit test in isolation.
//!
//! # Invariants
//!
//! - [`session::Session::curr_dir`] never begins with `/` and never
//!   contains a `..` segment; see [`path::validate_relative_path`].
//! - [`constants::REPLY_MAX_BODY_LEN`], [`constants::REQUEST_MAX_LEN`], and
//!   [`constants::DATA_BLOCK_MAX_LEN`] are the single source of truth for
//!   the framing limits consumed by `ftp-protocol`.

/// Configuration loading: the properties-file parser and [`config::ServerConfig`].
pub mod config;
/// Wire-format size limits and reply codes shared across crates.
pub mod constants;
/// Error kinds propagated by framing, session, and handler code.
pub mod error;
/// Path validation applied by handlers before touching the filesystem.
pub mod path;
/// The per-client [`session::Session`] record and [`session::DataMode`].
pub mod session;

pub use config::ServerConfig;
pub use error::FtpError;
pub use session::{DataMode, Session};
