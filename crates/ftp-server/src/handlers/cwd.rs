//! `CWD` — change the session's working directory.

use std::os::unix::io::RawFd;

use ftp_core::path::validate_relative_path;

use crate::error::ServerError;
use crate::handlers::HandlerContext;

pub(super) fn handle(
    ctx: &HandlerContext,
    control_fd: RawFd,
    arg: &str,
) -> Result<(u16, String), ServerError> {
    let segment = validate_relative_path(arg)?;

    let mut session = ctx.registry.lookup(control_fd)?;
    let candidate = session.resolve(segment);
    if !candidate.is_dir() {
        return Err(ServerError::InvalidArgument(format!(
            "{segment} is not a directory"
        )));
    }

    let new_curr_dir = if session.curr_dir.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{segment}", session.curr_dir)
    };
    session.set_curr_dir(&new_curr_dir);
    let curr_dir = session.curr_dir.clone();
    ctx.registry.replace(control_fd, session)?;

    Ok((200, curr_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{context, root_arc};
    use ftp_core::Session;
    use std::path::Path;

    #[test]
    fn changes_into_existing_subdirectory() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("sub")).unwrap();
        let ctx = context(root.path());
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(root.path())))
            .unwrap();

        let (code, body) = handle(&ctx, 3, "sub").unwrap();
        assert_eq!(code, 200);
        assert_eq!(body, "sub");
        assert_eq!(ctx.registry.lookup(3).unwrap().curr_dir, "sub");
    }

    #[test]
    fn rejects_nonexistent_directory() {
        let root = tempfile::tempdir().unwrap();
        let ctx = context(root.path());
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(root.path())))
            .unwrap();

        assert!(handle(&ctx, 3, "missing").is_err());
    }

    #[test]
    fn rejects_path_traversal() {
        let ctx = context(Path::new("/srv/ftp"));
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(Path::new("/srv/ftp"))))
            .unwrap();

        assert!(handle(&ctx, 3, "../etc").is_err());
    }
}
