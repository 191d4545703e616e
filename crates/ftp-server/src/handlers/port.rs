//! `PORT` — select ACTIVE data mode against a peer-supplied address.

use std::os::unix::io::RawFd;

use ftp_core::DataMode;

use crate::data_channel::parse_port_argument;
use crate::error::ServerError;
use crate::handlers::{close_existing_data_channel, HandlerContext};

pub(super) fn handle(
    ctx: &HandlerContext,
    control_fd: RawFd,
    arg: &str,
) -> Result<(u16, String), ServerError> {
    let (ip, port) = parse_port_argument(arg)?;

    let mut session = ctx.registry.lookup(control_fd)?;
    close_existing_data_channel(&mut session);

    session.data_mode = Some(DataMode::Active);
    session.peer_data_addr = Some((ip, port));
    ctx.registry.replace(control_fd, session)?;

    Ok((200, "PORT command successful".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{context, root_arc};
    use ftp_core::Session;
    use std::path::Path;

    #[test]
    fn selects_active_mode_and_records_peer_address() {
        let root = Path::new("/srv/ftp");
        let ctx = context(root);
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(root)))
            .unwrap();

        let (code, _) = handle(&ctx, 3, "10.0.0.5,2121").unwrap();
        assert_eq!(code, 200);

        let session = ctx.registry.lookup(3).unwrap();
        assert_eq!(session.data_mode, Some(DataMode::Active));
        assert_eq!(
            session.peer_data_addr,
            Some(("10.0.0.5".to_string(), "2121".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_argument() {
        let root = Path::new("/srv/ftp");
        let ctx = context(root);
        ctx.registry
            .insert(Session::new(3, "127.0.0.1", "4242", root_arc(root)))
            .unwrap();

        assert!(handle(&ctx, 3, "not-an-address").is_err());
    }
}
