//! Wire-format size limits and reply codes.
//!
//! These values are the single source of truth: `ftp-protocol` enforces the
//! length limits, and `ftp-server` emits the reply codes.

/// Maximum body length, in bytes, of a [`Request`](crate) message.
pub const REQUEST_MAX_LEN: usize = 512;
/// Maximum body length, in bytes, of a [`Reply`](crate) message.
pub const REPLY_MAX_BODY_LEN: usize = 4096;
/// Maximum payload length, in bytes, of a single [`DataBlock`](crate) message.
pub const DATA_BLOCK_MAX_LEN: usize = 2048;
/// Bit set in a `DataBlock` descriptor byte to mark the final block of a transfer.
pub const DATA_BLOCK_EOF_BIT: u8 = 0x40;

/// Default worker pool size when `threads_number` is absent from the properties file.
pub const DEFAULT_THREADS_NUMBER: u16 = 20;
/// Inclusive lower bound accepted for `threads_number`.
pub const MIN_THREADS_NUMBER: u16 = 1;
/// Inclusive upper bound accepted for `threads_number`.
pub const MAX_THREADS_NUMBER: u16 = 255;

/// Command completed successfully; body carries a directory listing context.
pub const REPLY_OK: u16 = 200;
/// Opening data connection, status OK (unused by reply-sending handlers directly
/// but retained so the wire vocabulary matches the historical reply table).
pub const REPLY_FILE_STATUS_OK: u16 = 150;
/// Data connection open, starting transfer.
pub const REPLY_DATA_CONN_OPEN: u16 = 125;
/// Closing control connection; server is done.
pub const REPLY_CLOSING: u16 = 221;
/// Data connection open, no transfer in progress.
pub const REPLY_DATA_CONN_OPEN_NO_TRANSFER: u16 = 225;
/// Entering passive mode; body carries `<ip>,<port>`.
pub const REPLY_ENTERING_PASSIVE: u16 = 227;
/// Requested file action completed.
pub const REPLY_FILE_ACTION_COMPLETE: u16 = 250;
/// Can't open data connection.
pub const REPLY_CANNOT_OPEN_DATA_CONN: u16 = 425;
/// Connection closed; transfer aborted.
pub const REPLY_CONN_CLOSED_TRANSFER_ABORTED: u16 = 426;
/// Requested file action not taken: file unavailable.
pub const REPLY_FILE_UNAVAILABLE: u16 = 450;
/// Requested action aborted: local error in processing.
pub const REPLY_LOCAL_PROCESS_ERROR: u16 = 451;
/// Syntax error, command unrecognized.
pub const REPLY_SYNTAX_ERROR: u16 = 500;
/// Syntax error in parameters or arguments.
pub const REPLY_PARAM_SYNTAX_ERROR: u16 = 501;
/// Requested action not taken: file unavailable (e.g. not found, no access).
pub const REPLY_FILE_NOT_FOUND: u16 = 550;
