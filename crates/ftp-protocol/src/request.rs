//! `Request` framing: `u16` length, body ≤ 512 bytes.

use std::io::{Read, Write};

use ftp_core::constants::REQUEST_MAX_LEN;

use crate::error::FramingError;
use crate::io::{read_exact, write_all};

/// A framed request: the raw command line a client sent on its control connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Request body. Trailing `\0` is appended on receipt, stripped on send.
    pub body: Vec<u8>,
}

impl Request {
    /// Builds a request from a UTF-8 command line.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into().into_bytes(),
        }
    }

    /// Serializes and writes this request: `len`, then `body`.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::TooLarge`] if `body` exceeds [`REQUEST_MAX_LEN`].
    pub fn send(&self, writer: &mut impl Write) -> Result<(), FramingError> {
        if self.body.len() > REQUEST_MAX_LEN {
            return Err(FramingError::TooLarge {
                len: self.body.len(),
                max: REQUEST_MAX_LEN,
            });
        }

        #[allow(clippy::cast_possible_truncation)]
        let len = self.body.len() as u16;
        write_all(writer, &len.to_be_bytes())?;
        write_all(writer, &self.body)?;
        Ok(())
    }

    /// Reads a request: `len`, then `len` body bytes plus a trailing nul.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::TooLarge`] if the declared length exceeds
    /// [`REQUEST_MAX_LEN`], or an I/O variant if the descriptor closes or
    /// fails mid-frame.
    pub fn recv(reader: &mut impl Read) -> Result<Self, FramingError> {
        let mut len_buf = [0u8; 2];
        read_exact(reader, &mut len_buf)?;
        let len = usize::from(u16::from_be_bytes(len_buf));
        if len > REQUEST_MAX_LEN {
            return Err(FramingError::TooLarge {
                len,
                max: REQUEST_MAX_LEN,
            });
        }

        let mut body = vec![0u8; len + 1];
        read_exact(reader, &mut body[..len])?;
        body[len] = 0;

        Ok(Self { body })
    }

    /// Returns the body with its trailing nul (if any) trimmed, lossily as UTF-8.
    #[must_use]
    pub fn line(&self) -> String {
        String::from_utf8_lossy(self.body.split(|&b| b == 0).next().unwrap_or(&[])).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_command_line() {
        let request = Request::new("CWD sub");
        let mut buf = Vec::new();
        request.send(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded = Request::recv(&mut cursor).unwrap();
        assert_eq!(decoded.line(), "CWD sub");
    }

    #[test]
    fn recv_appends_trailing_nul() {
        let request = Request::new("PWD");
        let mut buf = Vec::new();
        request.send(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded = Request::recv(&mut cursor).unwrap();
        assert_eq!(decoded.body.last(), Some(&0u8));
    }

    #[test]
    fn send_rejects_oversized_body() {
        let request = Request::new("x".repeat(REQUEST_MAX_LEN + 1));
        let mut buf = Vec::new();
        let err = request.send(&mut buf).unwrap_err();
        assert!(matches!(err, FramingError::TooLarge { .. }));
    }

    #[test]
    fn empty_request_round_trips() {
        let request = Request::new("");
        let mut buf = Vec::new();
        request.send(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        let decoded = Request::recv(&mut cursor).unwrap();
        assert_eq!(decoded.line(), "");
    }
}
