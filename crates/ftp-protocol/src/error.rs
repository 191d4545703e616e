//! Errors produced while encoding or decoding framed messages.

use std::io;

/// Failure reading or writing a [`crate::Reply`], [`crate::Request`], or [`crate::DataBlock`].
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// The header declared a body length exceeding the message kind's maximum.
    #[error("frame length {len} exceeds the maximum of {max}")]
    TooLarge {
        /// Length declared in the wire header.
        len: usize,
        /// Maximum permitted for this message kind.
        max: usize,
    },

    /// The descriptor reached EOF before a complete header or body arrived.
    #[error("connection closed mid-frame")]
    UnexpectedEof,

    /// The underlying read or write failed.
    #[error("I/O error during framing: {0}")]
    Io(#[from] io::Error),
}
