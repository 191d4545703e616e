//! `PASV` — select PASSIVE data mode by opening a listening socket.

use std::os::unix::io::RawFd;

use ftp_core::DataMode;

use crate::data_channel::{format_host_port, open_passive};
use crate::error::ServerError;
use crate::handlers::{close_existing_data_channel, HandlerContext};

pub(super) fn handle(ctx: &HandlerContext, control_fd: RawFd) -> Result<(u16, String), ServerError> {
    let mut session = ctx.registry.lookup(control_fd)?;
    close_existing_data_channel(&mut session);

    let listener = open_passive()?;
    session.listen_fd = Some(listener.listen_fd);
    session.data_mode = Some(DataMode::Passive);
    ctx.registry.replace(control_fd, session)?;

    notify_reactor(ctx.wake_fd);

    Ok((227, format_host_port(listener.ip, listener.port)))
}

/// Writes to the reactor's `eventfd`-like wake-up descriptor so it scans the
/// registry for newly installed passive listeners.
fn notify_reactor(wake_fd: RawFd) {
    if wake_fd < 0 {
        return;
    }
    let one: u64 = 1;
    #[allow(unsafe_code)]
    unsafe {
        let _ = libc::write(
            wake_fd,
            std::ptr::addr_of!(one).cast::<libc::c_void>(),
            std::mem::size_of::<u64>(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{context, root_arc};
    use ftp_core::Session;
    use std::path::Path;

    #[test]
    fn opens_listener_and_records_passive_mode() {
        let root = Path::new("/srv/ftp");
        let ctx = context(root);
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(root)))
            .unwrap();

        let (code, body) = handle(&ctx, 3).unwrap();
        assert_eq!(code, 227);
        assert!(body.contains(','));

        let session = ctx.registry.lookup(3).unwrap();
        assert_eq!(session.data_mode, Some(DataMode::Passive));
        assert!(session.listen_fd.is_some());

        #[allow(unsafe_code)]
        unsafe {
            libc::close(session.listen_fd.unwrap());
        }
    }

    #[test]
    fn second_pasv_closes_the_first_listener() {
        let root = Path::new("/srv/ftp");
        let ctx = context(root);
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(root)))
            .unwrap();

        handle(&ctx, 3).unwrap();
        let first_listen_fd = ctx.registry.lookup(3).unwrap().listen_fd.unwrap();

        handle(&ctx, 3).unwrap();
        let session = ctx.registry.lookup(3).unwrap();
        let second_listen_fd = session.listen_fd.unwrap();
        assert_ne!(first_listen_fd, second_listen_fd);

        // The first listener must already be closed: fcntl on it now fails with EBADF.
        #[allow(unsafe_code)]
        let rc = unsafe { libc::fcntl(first_listen_fd, libc::F_GETFD) };
        assert_eq!(rc, -1, "expected the first PASV listener to already be closed");

        #[allow(unsafe_code)]
        unsafe {
            libc::close(second_listen_fd);
        }
    }
}
