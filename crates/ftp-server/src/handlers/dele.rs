//! `DELE` — delete a regular file relative to the session's working directory.

use std::os::unix::io::RawFd;

use ftp_core::path::validate_relative_path;
use ftp_core::FtpError;

use crate::error::ServerError;
use crate::handlers::HandlerContext;

pub(super) fn handle(
    ctx: &HandlerContext,
    control_fd: RawFd,
    arg: &str,
) -> Result<(u16, String), ServerError> {
    let segment = validate_relative_path(arg)?;
    let session = ctx.registry.lookup(control_fd)?;
    let target = session.resolve(segment);

    std::fs::remove_file(&target).map_err(|source| FtpError::fs(target, source))?;

    Ok((250, format!("file {segment} deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{context, root_arc};
    use ftp_core::Session;

    #[test]
    fn deletes_existing_file() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("datafile"), b"data").unwrap();
        let ctx = context(root.path());
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(root.path())))
            .unwrap();

        let (code, _) = handle(&ctx, 3, "datafile").unwrap();
        assert_eq!(code, 250);
        assert!(!root.path().join("datafile").exists());
    }

    #[test]
    fn fails_on_missing_file() {
        let root = tempfile::tempdir().unwrap();
        let ctx = context(root.path());
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(root.path())))
            .unwrap();

        assert!(handle(&ctx, 3, "missingfile").is_err());
    }

    #[test]
    fn rejects_dotted_filename_per_conservative_path_policy() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("file.txt"), b"data").unwrap();
        let ctx = context(root.path());
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(root.path())))
            .unwrap();

        assert!(handle(&ctx, 3, "file.txt").is_err());
    }
}
