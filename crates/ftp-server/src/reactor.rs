//! The single-threaded [`Reactor`]: the `epoll`-driven main loop.
//!
//! Registers the control-port listen socket and an `eventfd` wake-up
//! descriptor at startup, then demultiplexes readiness events into
//! *Greet*, *GetRequest*, and *AcceptDataConn* work submitted to the
//! [`WorkerPool`]. SIGINT is unblocked only on this thread; every worker
//! thread masks it so a Ctrl-C always lands here.

use std::collections::HashSet;
use std::net::TcpListener;
use std::os::unix::io::{FromRawFd, IntoRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ftp_core::{DataMode, ServerConfig, Session};
use ftp_protocol::{FramingError, Reply, Request};
use logging_sink::LogSink;

use crate::command;
use crate::error::ServerError;
use crate::handlers::{self, HandlerContext};
use crate::registry::SessionRegistry;
use crate::worker_pool::WorkerPool;

static SIGINT_RECEIVED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signum: libc::c_int) {
    SIGINT_RECEIVED.store(true, Ordering::SeqCst);
}

/// Returns `true` once `SIGINT` has been observed.
///
/// Polled by the per-block loops in `LIST`/`RETR`/`STOR` so an in-flight
/// transfer aborts with a 450 reply instead of running to completion (or
/// hanging) while the reactor is trying to shut down.
#[must_use]
pub fn shutdown_requested() -> bool {
    SIGINT_RECEIVED.load(Ordering::SeqCst)
}

/// Returns `true` if `err` is a read/write timeout rather than a genuine
/// I/O failure — the signal a bounded-timeout data socket gives back so its
/// caller can recheck [`shutdown_requested`] instead of blocking forever.
#[must_use]
pub fn is_blocking_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

/// Runs `attempt` repeatedly while it fails with a bounded read/write
/// timeout, rechecking [`shutdown_requested`] between tries.
///
/// `LIST`/`RETR`/`STOR` send or receive one [`ftp_protocol::DataBlock`] at a
/// time over a data socket with a short read/write timeout applied
/// (`data_channel::DATA_CHANNEL_IO_TIMEOUT`); wrapping each such call in this
/// helper turns "blocked on a stalled peer" into a bounded number of retries
/// that each give the shutdown flag a chance to abort the transfer, rather
/// than a single I/O call blocking for however long the peer stays silent.
pub fn retry_until_shutdown_or_done<T>(
    mut attempt: impl FnMut() -> Result<T, ServerError>,
) -> Result<T, ServerError> {
    loop {
        match attempt() {
            Err(ServerError::Framing(FramingError::Io(io_err))) if is_blocking_timeout(&io_err) => {
                if shutdown_requested() {
                    return Err(ServerError::ShutdownInProgress);
                }
            }
            other => return other,
        }
    }
}

/// Installs a `SIGINT` handler that only flips [`SIGINT_RECEIVED`], and
/// masks `SIGINT` on every thread but the caller's.
///
/// # Errors
///
/// Returns [`ServerError::Syscall`] if `sigaction` or `pthread_sigmask` fails.
fn install_signal_handling() -> Result<(), ServerError> {
    #[allow(unsafe_code)]
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_sigint as usize;
        action.sa_flags = 0;
        libc::sigemptyset(std::ptr::addr_of_mut!(action.sa_mask));
        if libc::sigaction(libc::SIGINT, std::ptr::addr_of!(action), std::ptr::null_mut()) != 0 {
            return Err(ServerError::Syscall(std::io::Error::last_os_error()));
        }

        // Block SIGPIPE process-wide: a peer closing a data connection mid-write
        // must surface as an EPIPE, not terminate the process.
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
    Ok(())
}

/// Blocks or unblocks `SIGINT` on the calling thread.
///
/// Worker threads are spawned with `SIGINT` blocked so they never receive
/// it (new threads inherit the spawning thread's mask); the reactor thread
/// unblocks it again immediately afterward so the signal always lands
/// there.
fn set_sigint_blocked(blocked: bool) {
    #[allow(unsafe_code)]
    unsafe {
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(std::ptr::addr_of_mut!(set));
        libc::sigaddset(std::ptr::addr_of_mut!(set), libc::SIGINT);
        let how = if blocked { libc::SIG_BLOCK } else { libc::SIG_UNBLOCK };
        libc::pthread_sigmask(how, std::ptr::addr_of!(set), std::ptr::null_mut());
    }
}

/// The reactor's epoll instance, listen socket, and wake-up descriptor.
pub struct Reactor {
    epoll_fd: RawFd,
    wake_fd: RawFd,
    listen_fd: RawFd,
    registered_listen_fds: HashSet<RawFd>,
    registry: Arc<SessionRegistry>,
    pool: WorkerPool,
    config: Arc<ServerConfig>,
    log: LogSink,
}

const EPOLL_MAX_EVENTS: usize = 64;

impl Reactor {
    /// Builds a reactor bound to `config.control_port`, ready to [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Syscall`] if any setup syscall (socket
    /// binding, `epoll_create1`, `eventfd`, signal installation) fails.
    pub fn bind(config: Arc<ServerConfig>, log: LogSink) -> Result<Self, ServerError> {
        install_signal_handling()?;

        let listener = TcpListener::bind(("0.0.0.0", config.control_port))
            .map_err(ServerError::Syscall)?;
        let listen_fd = listener.into_raw_fd();

        #[allow(unsafe_code)]
        let epoll_fd = unsafe { libc::epoll_create1(0) };
        if epoll_fd < 0 {
            return Err(ServerError::Syscall(std::io::Error::last_os_error()));
        }

        #[allow(unsafe_code)]
        let wake_fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK) };
        if wake_fd < 0 {
            return Err(ServerError::Syscall(std::io::Error::last_os_error()));
        }

        set_sigint_blocked(true);
        let pool = WorkerPool::new(config.threads_number);
        set_sigint_blocked(false);

        let mut reactor = Self {
            epoll_fd,
            wake_fd,
            listen_fd,
            registered_listen_fds: HashSet::new(),
            registry: Arc::new(SessionRegistry::new()),
            pool,
            config,
            log,
        };

        reactor.epoll_add(listen_fd, libc::EPOLLIN as u32, false)?;
        reactor.epoll_add(wake_fd, libc::EPOLLIN as u32, false)?;

        Ok(reactor)
    }

    fn context(&self) -> HandlerContext {
        HandlerContext {
            registry: Arc::clone(&self.registry),
            config: Arc::clone(&self.config),
            epoll_fd: self.epoll_fd,
            wake_fd: self.wake_fd,
            log: self.log.clone(),
        }
    }

    /// Runs the main readiness loop until `SIGINT` is observed, then shuts down.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Syscall`] if `epoll_wait` fails for a reason
    /// other than an interrupted system call.
    pub fn run(mut self) -> Result<(), ServerError> {
        let mut events = vec![libc::epoll_event { events: 0, u64: 0 }; EPOLL_MAX_EVENTS];

        loop {
            if SIGINT_RECEIVED.load(Ordering::SeqCst) {
                tracing::info!("SIGINT received, shutting down");
                break;
            }

            #[allow(unsafe_code)]
            let ready = unsafe {
                libc::epoll_wait(
                    self.epoll_fd,
                    events.as_mut_ptr(),
                    EPOLL_MAX_EVENTS as i32,
                    1000,
                )
            };

            if ready < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(ServerError::Syscall(err));
            }

            #[allow(clippy::cast_sign_loss)]
            for event in &events[..ready as usize] {
                // SAFETY: `u64` holds a RawFd we stored via `epoll_add`.
                #[allow(clippy::cast_possible_truncation)]
                let fd = event.u64 as RawFd;
                self.handle_event(fd, event.events);
            }
        }

        self.shutdown();
        Ok(())
    }

    fn handle_event(&mut self, fd: RawFd, events: u32) {
        if fd == self.listen_fd {
            self.accept_control_connection();
        } else if fd == self.wake_fd {
            self.drain_wake_and_register_passive_listeners();
        } else if events & (libc::EPOLLHUP as u32 | libc::EPOLLERR as u32) != 0 {
            self.close_session_for(fd);
        } else if self.registry.lookup(fd).is_ok_and(|s| s.control_fd == fd) {
            self.submit_get_request(fd);
        } else {
            self.accept_data_connection(fd);
        }
    }

    fn accept_control_connection(&mut self) {
        #[allow(unsafe_code)]
        let accepted = unsafe { libc::accept(self.listen_fd, std::ptr::null_mut(), std::ptr::null_mut()) };
        if accepted < 0 {
            tracing::warn!(error = %std::io::Error::last_os_error(), "accept failed");
            return;
        }

        let peer = peer_address(accepted);
        let session = Session::new(
            accepted,
            peer.0,
            peer.1,
            Arc::new(self.config.root_directory.clone()),
        );

        if self.registry.insert(session).is_err() {
            #[allow(unsafe_code)]
            unsafe {
                libc::close(accepted);
            }
            return;
        }

        if self.epoll_add(accepted, libc::EPOLLIN as u32, true).is_err() {
            let _ = self.registry.remove(accepted);
            return;
        }

        let epoll_fd = self.epoll_fd;
        self.pool.submit(Box::new(move || {
            let (code, body) = handlers::greet();
            send_reply(accepted, code, &body);
            rearm(epoll_fd, accepted);
        }));
    }

    fn submit_get_request(&mut self, control_fd: RawFd) {
        let ctx = self.context();
        let epoll_fd = self.epoll_fd;
        self.pool.submit(Box::new(move || {
            let closed = process_request(&ctx, control_fd);
            if !closed {
                rearm(epoll_fd, control_fd);
            }
        }));
    }

    fn accept_data_connection(&mut self, listen_fd: RawFd) {
        #[allow(unsafe_code)]
        let accepted = unsafe { libc::accept(listen_fd, std::ptr::null_mut(), std::ptr::null_mut()) };

        let Ok(mut session) = self.registry.lookup(listen_fd) else {
            if accepted >= 0 {
                #[allow(unsafe_code)]
                unsafe {
                    libc::close(accepted);
                }
            }
            return;
        };

        self.epoll_del(listen_fd);
        #[allow(unsafe_code)]
        unsafe {
            libc::close(listen_fd);
        }
        self.registered_listen_fds.remove(&listen_fd);

        session.listen_fd = None;
        if accepted >= 0 {
            session.data_fd = Some(accepted);
        }
        let control_fd = session.control_fd;
        let _ = self.registry.replace(control_fd, session);
    }

    fn drain_wake_and_register_passive_listeners(&mut self) {
        let mut counter = [0u8; 8];
        #[allow(unsafe_code)]
        unsafe {
            libc::read(
                self.wake_fd,
                counter.as_mut_ptr().cast::<libc::c_void>(),
                counter.len(),
            );
        }

        for session in self.registry.passive_listeners() {
            if session.data_mode != Some(DataMode::Passive) {
                continue;
            }
            let Some(listen_fd) = session.listen_fd else {
                continue;
            };
            if self.registered_listen_fds.contains(&listen_fd) {
                continue;
            }
            if self
                .epoll_add(listen_fd, libc::EPOLLIN as u32, false)
                .is_ok()
            {
                self.registered_listen_fds.insert(listen_fd);
            }
        }
    }

    fn close_session_for(&mut self, fd: RawFd) {
        self.epoll_del(fd);
        if let Ok(session) = self.registry.lookup(fd) {
            let _ = self.registry.remove(session.control_fd);
        }
    }

    fn epoll_add(&self, fd: RawFd, events_mask: u32, oneshot: bool) -> Result<(), ServerError> {
        let flags = if oneshot {
            events_mask | libc::EPOLLONESHOT as u32
        } else {
            events_mask
        };
        let mut event = libc::epoll_event {
            events: flags,
            u64: fd_to_u64(fd),
        };
        #[allow(unsafe_code)]
        let rc = unsafe {
            libc::epoll_ctl(
                self.epoll_fd,
                libc::EPOLL_CTL_ADD,
                fd,
                std::ptr::addr_of_mut!(event),
            )
        };
        if rc != 0 {
            return Err(ServerError::Syscall(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    fn epoll_del(&self, fd: RawFd) {
        #[allow(unsafe_code)]
        unsafe {
            libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_DEL, fd, std::ptr::null_mut());
        }
    }

    fn shutdown(self) {
        #[allow(unsafe_code)]
        unsafe {
            libc::close(self.listen_fd);
            libc::close(self.wake_fd);
            libc::close(self.epoll_fd);
        }
        self.pool.shutdown();
        self.registry.clear();
        self.log.flush();
    }
}

/// Services one request on `control_fd`.
///
/// Returns `true` if the session is already gone (control descriptor
/// closed and removed from the registry) by the time this returns, so the
/// caller must not `rearm` it — the fd number may already have been handed
/// back out to a new `accept`.
fn process_request(ctx: &HandlerContext, control_fd: RawFd) -> bool {
    let mut stream = unsafe_stream_from(control_fd);

    let request = match Request::recv(&mut stream) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(control_fd, error = %err, "failed to receive request");
            let _ = ctx.registry.remove(control_fd);
            forget_stream(stream);
            return true;
        }
    };

    let parsed = command::parse(&request.line());
    let is_quit = matches!(parsed, command::Command::Quit);
    let (code, body) = handlers::dispatch(ctx, control_fd, parsed);
    let reply = Reply::new(code, body);
    if let Err(err) = reply.send(&mut stream) {
        tracing::warn!(control_fd, error = %err, "failed to send reply");
    }

    forget_stream(stream);

    if is_quit {
        let _ = ctx.registry.remove(control_fd);
    }
    is_quit
}

fn send_reply(control_fd: RawFd, code: u16, body: &str) {
    let mut stream = unsafe_stream_from(control_fd);
    let reply = Reply::new(code, body.to_string());
    if let Err(err) = reply.send(&mut stream) {
        tracing::warn!(control_fd, error = %err, "failed to send greeting");
    }
    forget_stream(stream);
}

/// Wraps `fd` as a [`std::net::TcpStream`] for one framing operation
/// without taking ownership: the stream is `mem::forget`-ten by
/// [`forget_stream`] immediately afterward since the session registry, not
/// this borrow, owns the descriptor's lifetime.
fn unsafe_stream_from(fd: RawFd) -> std::net::TcpStream {
    #[allow(unsafe_code)]
    unsafe {
        std::net::TcpStream::from_raw_fd(fd)
    }
}

fn forget_stream(stream: std::net::TcpStream) {
    let _ = stream.into_raw_fd();
}

fn rearm(epoll_fd: RawFd, fd: RawFd) {
    let mut event = libc::epoll_event {
        events: libc::EPOLLIN as u32 | libc::EPOLLONESHOT as u32,
        u64: fd_to_u64(fd),
    };
    #[allow(unsafe_code)]
    unsafe {
        libc::epoll_ctl(epoll_fd, libc::EPOLL_CTL_MOD, fd, std::ptr::addr_of_mut!(event));
    }
}

const fn fd_to_u64(fd: RawFd) -> u64 {
    #[allow(clippy::cast_sign_loss)]
    {
        fd as u64
    }
}

fn peer_address(fd: RawFd) -> (String, String) {
    #[allow(unsafe_code)]
    unsafe {
        let mut addr: libc::sockaddr_in = std::mem::zeroed();
        let mut len = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
        if libc::getpeername(
            fd,
            std::ptr::addr_of_mut!(addr).cast::<libc::sockaddr>(),
            std::ptr::addr_of_mut!(len),
        ) != 0
        {
            return ("0.0.0.0".to_string(), "0".to_string());
        }
        let octets = addr.sin_addr.s_addr.to_ne_bytes();
        let ip = std::net::Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]);
        (ip.to_string(), u16::from_be(addr.sin_port).to_string())
    }
}
