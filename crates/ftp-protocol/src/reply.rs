//! `Reply` framing: `u16` status code, `u16` length, body ≤ 4,096 bytes.

use std::io::{Read, Write};

use ftp_core::constants::REPLY_MAX_BODY_LEN;

use crate::error::FramingError;
use crate::io::{read_exact, write_all};

/// A framed reply: a numeric status code plus a UTF-8 (not enforced) body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit status code, e.g. 250.
    pub code: u16,
    /// Reply body. Trailing `\0` is appended on receipt, stripped on send.
    pub body: Vec<u8>,
}

impl Reply {
    /// Builds a reply from a code and a UTF-8 body.
    #[must_use]
    pub fn new(code: u16, body: impl Into<String>) -> Self {
        Self {
            code,
            body: body.into().into_bytes(),
        }
    }

    /// Serializes and writes this reply: `code`, `len`, `body`, all big-endian headers.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::TooLarge`] if `body` exceeds
    /// [`REPLY_MAX_BODY_LEN`], or [`FramingError::Io`]/[`FramingError::UnexpectedEof`]
    /// if the write fails partway through.
    pub fn send(&self, writer: &mut impl Write) -> Result<(), FramingError> {
        if self.body.len() > REPLY_MAX_BODY_LEN {
            return Err(FramingError::TooLarge {
                len: self.body.len(),
                max: REPLY_MAX_BODY_LEN,
            });
        }

        write_all(writer, &self.code.to_be_bytes())?;
        #[allow(clippy::cast_possible_truncation)]
        let len = self.body.len() as u16;
        write_all(writer, &len.to_be_bytes())?;
        write_all(writer, &self.body)?;
        Ok(())
    }

    /// Reads a reply: `code`, `len`, then `len` body bytes plus a trailing nul.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::TooLarge`] if the declared length exceeds
    /// [`REPLY_MAX_BODY_LEN`], or an I/O variant if the descriptor closes or
    /// fails mid-frame.
    pub fn recv(reader: &mut impl Read) -> Result<Self, FramingError> {
        let mut code_buf = [0u8; 2];
        read_exact(reader, &mut code_buf)?;
        let code = u16::from_be_bytes(code_buf);

        let mut len_buf = [0u8; 2];
        read_exact(reader, &mut len_buf)?;
        let len = usize::from(u16::from_be_bytes(len_buf));
        if len > REPLY_MAX_BODY_LEN {
            return Err(FramingError::TooLarge {
                len,
                max: REPLY_MAX_BODY_LEN,
            });
        }

        let mut body = vec![0u8; len + 1];
        read_exact(reader, &mut body[..len])?;
        body[len] = 0;

        Ok(Self { code, body })
    }

    /// Returns the body with its trailing nul (if any) trimmed, lossily as UTF-8.
    #[must_use]
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(self.body.split(|&b| b == 0).next().unwrap_or(&[])).into_owned()
    }
}
