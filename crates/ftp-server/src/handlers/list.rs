//! `LIST` — stream a directory listing produced by a spawned `ls -lh` child.
//!
//! Rather than walking the directory in-process, the handler forks a child
//! that execs `ls -lh <path>` with its stdout redirected to the write end
//! of a pipe, then reads the read end non-blockingly, framing each chunk
//! as a [`ftp_protocol::DataBlock`].
//!
//! Each chunk is sent as its own block immediately. Whether it is the last
//! one is decided right there: after a successful read, a second
//! non-blocking one-byte probe read checks whether anything else is sitting
//! in the pipe. A probe that reports `EWOULDBLOCK` (or true EOF) means this
//! chunk is the last one, so it goes out with the EOF bit set; a probe that
//! returns a byte means there's more, so that byte is folded into the
//! current chunk and the loop continues. The child is reaped with a
//! blocking `waitpid` once the pipe is drained.

use std::ffi::CString;
use std::os::unix::io::RawFd;

use ftp_protocol::DataBlock;

use crate::data_channel::ensure_data_connection;
use crate::error::ServerError;
use crate::handlers::HandlerContext;
use crate::reactor::{retry_until_shutdown_or_done, shutdown_requested};

const CHUNK_LEN: usize = ftp_core::constants::DATA_BLOCK_MAX_LEN - 2;

pub(super) fn handle(
    ctx: &HandlerContext,
    control_fd: RawFd,
    arg: &str,
) -> Result<(u16, String), ServerError> {
    let session = ctx.registry.lookup(control_fd)?;
    let target = if arg.trim().is_empty() {
        session.current_path()
    } else {
        session.resolve(arg.trim())
    };

    let mut data_stream = ensure_data_connection(&ctx.registry, ctx.config.data_port, control_fd)?;

    let read_fd = spawn_ls_child(&target)?;
    let result = stream_pipe_as_data_blocks(read_fd, &mut data_stream);
    #[allow(unsafe_code)]
    unsafe {
        libc::close(read_fd);
    }
    result?;

    Ok((250, "directory listing complete".to_string()))
}

fn spawn_ls_child(path: &std::path::Path) -> Result<RawFd, ServerError> {
    let mut pipe_fds = [0i32; 2];
    #[allow(unsafe_code)]
    if unsafe { libc::pipe(pipe_fds.as_mut_ptr()) } != 0 {
        return Err(ServerError::Syscall(std::io::Error::last_os_error()));
    }
    let (read_fd, write_fd) = (pipe_fds[0], pipe_fds[1]);

    #[allow(unsafe_code)]
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        #[allow(unsafe_code)]
        unsafe {
            libc::close(read_fd);
            libc::close(write_fd);
        }
        return Err(ServerError::Syscall(std::io::Error::last_os_error()));
    }

    if pid == 0 {
        // Child: redirect stdout to the pipe and exec `ls -lh <path>`.
        #[allow(unsafe_code)]
        unsafe {
            libc::close(read_fd);
            libc::dup2(write_fd, libc::STDOUT_FILENO);
            libc::close(write_fd);

            let ls = CString::new("ls").unwrap();
            let flag = CString::new("-lh").unwrap();
            let path_arg = CString::new(path.as_os_str().as_encoded_bytes()).unwrap_or_else(|_| CString::new(".").unwrap());
            let argv = [ls.as_ptr(), flag.as_ptr(), path_arg.as_ptr(), std::ptr::null()];
            libc::execvp(ls.as_ptr(), argv.as_ptr());
            libc::_exit(127);
        }
    }

    #[allow(unsafe_code)]
    unsafe {
        libc::close(write_fd);
        let flags = libc::fcntl(read_fd, libc::F_GETFL, 0);
        libc::fcntl(read_fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
    }

    Ok(read_fd)
}

fn stream_pipe_as_data_blocks(
    read_fd: RawFd,
    data_stream: &mut impl std::io::Write,
) -> Result<(), ServerError> {
    // One extra byte of headroom for the EOF probe to fold into the chunk.
    let mut buf = vec![0u8; CHUNK_LEN + 1];

    loop {
        if shutdown_requested() {
            reap_child();
            return Err(ServerError::ShutdownInProgress);
        }

        #[allow(unsafe_code)]
        let n = unsafe {
            libc::read(read_fd, buf.as_mut_ptr().cast::<libc::c_void>(), CHUNK_LEN)
        };

        if n > 0 {
            #[allow(clippy::cast_sign_loss)]
            let mut len = n as usize;

            #[allow(unsafe_code)]
            let probe = unsafe {
                libc::read(
                    read_fd,
                    buf.as_mut_ptr().add(len).cast::<libc::c_void>(),
                    1,
                )
            };

            if probe > 0 {
                len += 1;
                let block = DataBlock::new(buf[..len].to_vec());
                retry_until_shutdown_or_done(|| block.send(data_stream).map_err(ServerError::from))?;
                continue;
            }

            // `probe == 0` (pipe closed) or `EWOULDBLOCK` (nothing else queued
            // right now) both mean this chunk is the last one.
            if probe < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() != std::io::ErrorKind::WouldBlock {
                    return Err(ServerError::Syscall(err));
                }
            }
            let block = DataBlock::final_block(buf[..len].to_vec());
            retry_until_shutdown_or_done(|| block.send(data_stream).map_err(ServerError::from))?;
            break;
        } else if n == 0 {
            let block = DataBlock::final_block(Vec::new());
            retry_until_shutdown_or_done(|| block.send(data_stream).map_err(ServerError::from))?;
            break;
        } else {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::WouldBlock {
                poll_readable(read_fd)?;
                continue;
            }
            return Err(ServerError::Syscall(err));
        }
    }

    reap_child();
    Ok(())
}

fn poll_readable(read_fd: RawFd) -> Result<(), ServerError> {
    let mut pollfd = libc::pollfd {
        fd: read_fd,
        events: libc::POLLIN,
        revents: 0,
    };
    #[allow(unsafe_code)]
    let rc = unsafe { libc::poll(std::ptr::addr_of_mut!(pollfd), 1, 1000) };
    if rc < 0 {
        return Err(ServerError::Syscall(std::io::Error::last_os_error()));
    }
    Ok(())
}

fn reap_child() {
    #[allow(unsafe_code)]
    unsafe {
        let mut status = 0i32;
        libc::waitpid(-1, std::ptr::addr_of_mut!(status), 0);
    }
}
