//! Path validation applied by handlers before any filesystem operation.
//!
//! The policy is deliberately conservative: it rejects some legal filenames
//! (e.g. `a.txt`, since it contains a `.`) in exchange for a trivially
//! auditable denial rule: some legal filenames are rejected on purpose
//! rather than trying to enumerate every safe case.

use crate::error::FtpError;

/// Validates a client-supplied path argument.
///
/// Checks run in this fixed order, so the *first* failing condition
/// determines the rejection reason:
///
/// 1. empty
/// 2. whitespace-only (after trimming)
/// 3. contains a `.` character, or begins with `/`
/// 4. contains the literal `../`
///
/// # Errors
///
/// Returns [`FtpError::PathRejected`] with a human-readable reason on the
/// first failing check.
pub fn validate_relative_path(raw: &str) -> Result<&str, FtpError> {
    if raw.is_empty() {
        return Err(FtpError::PathRejected("empty path".to_string()));
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FtpError::PathRejected("whitespace-only path".to_string()));
    }

    if trimmed.contains('.') || trimmed.starts_with('/') {
        return Err(FtpError::PathRejected(format!(
            "path '{trimmed}' is not allowed"
        )));
    }

    if trimmed.contains("../") {
        return Err(FtpError::PathRejected(format!(
            "path '{trimmed}' is not allowed"
        )));
    }

    Ok(trimmed)
}

/// Slash-normalizes a `curr_dir` value: collapses repeated `/`, strips a
/// leading `/` if present, and strips a trailing `/`.
#[must_use]
pub fn normalize_curr_dir(raw: &str) -> String {
    raw.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
