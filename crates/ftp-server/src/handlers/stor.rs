//! `STOR` — receive `DataBlock`s into a hidden temp file, then rename into place.
//!
//! The temp filename is `.{worker-id}{filename}`: writing under a name no
//! listing will show, keyed by the handling worker, avoids partial-file
//! races between two concurrent `STOR`s of the same name. On any failure
//! the temp file is unlinked rather than left behind.

use std::io::{Read, Write};
use std::os::unix::io::RawFd;

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
    let final_path = session.resolve(segment);
    let temp_path = temp_path_for(&session.resolve(""), segment);

    let mut data_stream = ensure_data_connection(&ctx.registry, ctx.config.data_port, control_fd)?;

    let result = receive_into_temp_file(&temp_path, &mut data_stream, ctx.config.max_transfer_bytes);

    match result {
        Ok(()) => {
            std::fs::rename(&temp_path, &final_path)
                .map_err(|source| FtpError::fs(final_path, source))?;
            Ok((250, "transfer complete".to_string()))
        }
        Err(err) => {
            let _ = std::fs::remove_file(&temp_path);
            Err(err)
        }
    }
}

fn temp_path_for(dir: &std::path::Path, filename: &str) -> std::path::PathBuf {
    #[allow(clippy::missing_const_for_fn)]
    fn worker_identity() -> u64 {
        std::thread::current().id().as_u64().get()
    }
    dir.join(format!(".{}{filename}", worker_identity()))
}

fn receive_into_temp_file(
    temp_path: &std::path::Path,
    data_stream: &mut impl Read,
    max_transfer_bytes: Option<u64>,
) -> Result<(), ServerError> {
    let mut file =
        std::fs::File::create(temp_path).map_err(|source| FtpError::fs(temp_path, source))?;

    let mut total: u64 = 0;
    loop {
        if shutdown_requested() {
            return Err(ServerError::ShutdownInProgress);
        }
        let block = retry_until_shutdown_or_done(|| DataBlock::recv(data_stream).map_err(ServerError::from))?;
        total += block.payload.len() as u64;
        if let Some(cap) = max_transfer_bytes {
            if total > cap {
                return Err(ServerError::InvalidArgument(format!(
                    "transfer exceeds configured cap of {cap} bytes"
                )));
            }
        }
        file.write_all(&block.payload)
            .map_err(|source| FtpError::fs(temp_path, source))?;
        if block.eof {
            break;
        }
    }

    Ok(())
}
