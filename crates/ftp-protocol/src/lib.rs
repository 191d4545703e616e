#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `ftp-protocol` encodes and decodes the three length-prefixed message
//! kinds that cross a session's control and data descriptors: [`Reply`],
//! [`Request`], and [`DataBlock`]. Nothing here knows about sockets,
//! sessions, or command semantics — it operates on anything implementing
//! [`std::io::Read`]/[`std::io::Write`], which in this workspace is a
//! `TcpStream` but could equally be an in-memory buffer in tests.
//!
//! # Design
//!
//! Each kind sends its header fields big-endian and then loops writing (or
//! reading) the body until the descriptor either delivers the full payload
//! or reports an error. There is no buffered-codec abstraction: a short
//! read or write is an ordinary loop iteration, not a special case.
//!
//! # Errors
//!
//! Every operation returns [`FramingError`], which distinguishes an
//! oversized declared length from a genuine I/O failure so callers can
//! decide whether the error is reportable to the peer or fatal to the
//! session.

mod data_block;
mod error;
mod io;
mod reply;
mod request;

pub use data_block::DataBlock;
pub use error::FramingError;
pub use reply::Reply;
pub use request::Request;
