//! `RETR` — stream a file to the peer as a sequence of `DataBlock`s.

use std::io::Read;
use std::os::unix::io::RawFd;

use ftp_core::constants::DATA_BLOCK_MAX_LEN;
use ftp_core::FtpError;
use ftp_protocol::DataBlock;

use crate::data_channel::ensure_data_connection;
use crate::error::ServerError;
use crate::handlers::HandlerContext;
use crate::reactor::{retry_until_shutdown_or_done, shutdown_requested};

pub(super) fn handle(
    ctx: &HandlerContext,
    control_fd: RawFd,
    arg: &str,
) -> Result<(u16, String), ServerError> {
    let segment = ftp_core::path::validate_relative_path(arg)?;
    let session = ctx.registry.lookup(control_fd)?;
    let target = session.resolve(segment);

    let mut file = std::fs::File::open(&target).map_err(|source| FtpError::fs(target, source))?;
    let mut data_stream = ensure_data_connection(&ctx.registry, ctx.config.data_port, control_fd)?;

    stream_file_as_data_blocks(&mut file, &mut data_stream)?;

    Ok((250, "transfer complete".to_string()))
}

fn stream_file_as_data_blocks(
    file: &mut impl Read,
    data_stream: &mut impl std::io::Write,
) -> Result<(), ServerError> {
    let mut buf = vec![0u8; DATA_BLOCK_MAX_LEN];
    loop {
        if shutdown_requested() {
            return Err(ServerError::ShutdownInProgress);
        }
        let n = file.read(&mut buf).map_err(ServerError::Syscall)?;
        if n < buf.len() {
            let block = DataBlock::final_block(buf[..n].to_vec());
            retry_until_shutdown_or_done(|| block.send(data_stream).map_err(ServerError::from))?;
            break;
        }
        let block = DataBlock::new(buf[..n].to_vec());
        retry_until_shutdown_or_done(|| block.send(data_stream).map_err(ServerError::from))?;
    }
    Ok(())
}
