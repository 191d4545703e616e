//! Loop-until-complete read/write primitives shared by every frame kind.
//!
//! There is no cooperative scheduling here: a short read or write simply
//! loops until the descriptor has given up the requested number of bytes or
//! reports EOF/an error, rather than reaching for a buffered-codec
//! abstraction.

use std::io::{Read, Write};

use crate::error::FramingError;

/// Writes every byte of `buf` to `writer`, looping past short writes.
pub(crate) fn write_all(writer: &mut impl Write, buf: &[u8]) -> Result<(), FramingError> {
    writer.write_all(buf)?;
    Ok(())
}

/// Reads exactly `buf.len()` bytes from `reader`, looping past short reads.
///
/// Returns [`FramingError::UnexpectedEof`] if the descriptor closes before
/// `buf` is filled.
pub(crate) fn read_exact(reader: &mut impl Read, buf: &mut [u8]) -> Result<(), FramingError> {
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            FramingError::UnexpectedEof
        } else {
            FramingError::Io(err)
        }
    })
}
