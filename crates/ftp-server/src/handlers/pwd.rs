//! `PWD` — print the session's full working directory.

use std::os::unix::io::RawFd;

use crate::error::ServerError;
use crate::handlers::HandlerContext;

pub(super) fn handle(ctx: &HandlerContext, control_fd: RawFd) -> Result<(u16, String), ServerError> {
    let session = ctx.registry.lookup(control_fd)?;
    Ok((200, session.printable_path()))
}
