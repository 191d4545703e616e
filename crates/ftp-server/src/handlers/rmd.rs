//! `RMD` — remove an empty directory relative to the session's working directory.

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

    std::fs::remove_dir(&target).map_err(|source| FtpError::fs(target, source))?;

    Ok((200, format!("directory {segment} removed")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{context, root_arc};
    use ftp_core::Session;

    #[test]
    fn removes_empty_directory() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("empty")).unwrap();
        let ctx = context(root.path());
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(root.path())))
            .unwrap();

        let (code, _) = handle(&ctx, 3, "empty").unwrap();
        assert_eq!(code, 200);
        assert!(!root.path().join("empty").exists());
    }

    #[test]
    fn fails_on_nonempty_directory() {
        let root = tempfile::tempdir().unwrap();
        let sub = root.path().join("full");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("file.txt"), b"x").unwrap();
        let ctx = context(root.path());
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(root.path())))
            .unwrap();

        assert!(handle(&ctx, 3, "full").is_err());
    }

    #[test]
    fn fails_on_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let ctx = context(root.path());
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(root.path())))
            .unwrap();

        assert!(handle(&ctx, 3, "missing").is_err());
    }
}
