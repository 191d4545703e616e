//! `DataBlock` framing: `u8` descriptor (EOF bit `0x40`), `u16` length, payload ≤ 2,048 bytes.
//!
//! Unlike [`crate::Reply`] and [`crate::Request`], a received `DataBlock`
//! carries no trailing nul — the payload is arbitrary binary data, not a
//! text line.

use std::io::{Read, Write};

use ftp_core::constants::{DATA_BLOCK_EOF_BIT, DATA_BLOCK_MAX_LEN};

use crate::error::FramingError;
use crate::io::{read_exact, write_all};

/// One chunk of a data-channel transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    /// `true` if this is the final block of the transfer.
    pub eof: bool,
    /// Raw payload, at most [`DATA_BLOCK_MAX_LEN`] bytes.
    pub payload: Vec<u8>,
}

impl DataBlock {
    /// Builds a non-final data block from `payload`.
    #[must_use]
    pub const fn new(payload: Vec<u8>) -> Self {
        Self {
            eof: false,
            payload,
        }
    }

    /// Builds the final data block of a transfer.
    #[must_use]
    pub const fn final_block(payload: Vec<u8>) -> Self {
        Self { eof: true, payload }
    }

    /// Serializes and writes this block: descriptor byte, `len`, then `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::TooLarge`] if `payload` exceeds [`DATA_BLOCK_MAX_LEN`].
    pub fn send(&self, writer: &mut impl Write) -> Result<(), FramingError> {
        if self.payload.len() > DATA_BLOCK_MAX_LEN {
            return Err(FramingError::TooLarge {
                len: self.payload.len(),
                max: DATA_BLOCK_MAX_LEN,
            });
        }

        let descriptor = if self.eof { DATA_BLOCK_EOF_BIT } else { 0 };
        write_all(writer, &[descriptor])?;
        #[allow(clippy::cast_possible_truncation)]
        let len = self.payload.len() as u16;
        write_all(writer, &len.to_be_bytes())?;
        write_all(writer, &self.payload)?;
        Ok(())
    }

    /// Reads a data block: descriptor byte, `len`, then `len` payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::TooLarge`] if the declared length exceeds
    /// [`DATA_BLOCK_MAX_LEN`], or an I/O variant if the descriptor closes or
    /// fails mid-frame.
    pub fn recv(reader: &mut impl Read) -> Result<Self, FramingError> {
        let mut descriptor_buf = [0u8; 1];
        read_exact(reader, &mut descriptor_buf)?;
        let eof = descriptor_buf[0] & DATA_BLOCK_EOF_BIT != 0;

        let mut len_buf = [0u8; 2];
        read_exact(reader, &mut len_buf)?;
        let len = usize::from(u16::from_be_bytes(len_buf));
        if len > DATA_BLOCK_MAX_LEN {
            return Err(FramingError::TooLarge {
                len,
                max: DATA_BLOCK_MAX_LEN,
            });
        }

        let mut payload = vec![0u8; len];
        read_exact(reader, &mut payload)?;

        Ok(Self { eof, payload })
    }
}
