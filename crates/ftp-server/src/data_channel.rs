//! Opening ACTIVE and PASSIVE data connections.
//!
//! ACTIVE dials out from the server's configured data port to the address a
//! `PORT` command advertised. PASSIVE enumerates the host's local IPv4
//! interfaces and binds a listening socket on the first one that accepts
//! it, returning that address so the caller can report it in a 227 reply.
//! PASSIVE tries each candidate address in turn rather than trusting a
//! single configured address, since not every interface on a multi-homed
//! host will accept a bind.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::time::Duration;

use socket2::{Domain, Socket, Type};

use ftp_core::DataMode;

use crate::error::ServerError;
use crate::registry::SessionRegistry;

/// Splits a `PORT` argument of the form `<ip>,<port>` into its two parts.
///
/// # Errors
///
/// Returns [`ServerError::InvalidArgument`] if `raw` does not contain
/// exactly one `,` separator.
pub fn parse_port_argument(raw: &str) -> Result<(String, String), ServerError> {
    let (ip, port) = raw
        .split_once(',')
        .ok_or_else(|| ServerError::InvalidArgument(format!("malformed PORT argument: {raw:?}")))?;
    let (ip, port) = (ip.trim(), port.trim());
    if ip.is_empty() || port.is_empty() {
        return Err(ServerError::InvalidArgument(format!(
            "malformed PORT argument: {raw:?}"
        )));
    }
    Ok((ip.to_string(), port.to_string()))
}

/// Opens an ACTIVE data connection: binds locally to `local_data_port`,
/// then connects to `peer_ip:peer_port`.
///
/// # Errors
///
/// Returns [`ServerError::InvalidArgument`] if the peer address fails to
/// parse, or [`ServerError::DataChannelUnavailable`] if bind or connect fails.
pub fn open_active(
    local_data_port: u16,
    peer_ip: &str,
    peer_port: &str,
) -> Result<RawFd, ServerError> {
    let peer_addr: SocketAddr = format!("{peer_ip}:{peer_port}")
        .parse()
        .map_err(|_| ServerError::InvalidArgument(format!("invalid peer address {peer_ip}:{peer_port}")))?;

    let domain = if peer_addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };
    let socket =
        Socket::new(domain, Type::STREAM, None).map_err(ServerError::DataChannelUnavailable)?;

    let local_addr: SocketAddr = if peer_addr.is_ipv6() {
        format!("[::]:{local_data_port}").parse().unwrap()
    } else {
        format!("0.0.0.0:{local_data_port}").parse().unwrap()
    };
    socket
        .bind(&local_addr.into())
        .map_err(ServerError::DataChannelUnavailable)?;
    socket
        .connect(&peer_addr.into())
        .map_err(ServerError::DataChannelUnavailable)?;

    Ok(socket.into_raw_fd())
}

/// Result of a successful [`open_passive`] call.
pub struct PassiveListener {
    /// Descriptor of the new listening socket; registered with the reactor by the caller.
    pub listen_fd: RawFd,
    /// Local IPv4 address the listener is bound to.
    pub ip: Ipv4Addr,
    /// Local port the listener is bound to.
    pub port: u16,
}

/// Enumerates local IPv4 interfaces and binds a listening socket on the
/// first one willing to accept a bind; returns its address for the 227 reply.
///
/// # Errors
///
/// Returns [`ServerError::DataChannelUnavailable`] if no local interface can be bound.
pub fn open_passive() -> Result<PassiveListener, ServerError> {
    let candidates = local_ipv4_addresses()?;

    let mut last_err = None;
    for ip in candidates {
        match try_bind_listener(ip) {
            Ok(listener) => return Ok(listener),
            Err(err) => last_err = Some(err),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        ServerError::DataChannelUnavailable(std::io::Error::other("no local interfaces available"))
    }))
}

fn try_bind_listener(ip: Ipv4Addr) -> Result<PassiveListener, ServerError> {
    let listener =
        TcpListener::bind(SocketAddrV4::new(ip, 0)).map_err(ServerError::DataChannelUnavailable)?;
    let local_addr = listener.local_addr().map_err(ServerError::DataChannelUnavailable)?;
    let port = local_addr.port();
    Ok(PassiveListener {
        listen_fd: listener.into_raw_fd(),
        ip,
        port,
    })
}

/// Returns every non-loopback IPv4 address configured on a local interface,
/// falling back to loopback if none are found.
fn local_ipv4_addresses() -> Result<Vec<Ipv4Addr>, ServerError> {
    #[allow(unsafe_code)]
    unsafe {
        let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
        if libc::getifaddrs(&mut head) != 0 {
            return Err(ServerError::Syscall(std::io::Error::last_os_error()));
        }

        let mut addresses = Vec::new();
        let mut cursor = head;
        while !cursor.is_null() {
            let entry = &*cursor;
            if !entry.ifa_addr.is_null() && (*entry.ifa_addr).sa_family as i32 == libc::AF_INET {
                let sockaddr_in = &*entry.ifa_addr.cast::<libc::sockaddr_in>();
                let octets = sockaddr_in.sin_addr.s_addr.to_ne_bytes();
                let ip = Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]);
                if !ip.is_loopback() {
                    addresses.push(ip);
                }
            }
            cursor = entry.ifa_next;
        }
        libc::freeifaddrs(head);

        if addresses.is_empty() {
            addresses.push(Ipv4Addr::LOCALHOST);
        }
        Ok(addresses)
    }
}

/// Formats `<ip>,<port>` the way PASV replies and PORT arguments both use.
#[must_use]
pub fn format_host_port(ip: Ipv4Addr, port: u16) -> String {
    format!("{ip},{port}")
}

/// Read/write timeout applied to every data connection, so a `LIST`/`RETR`/
/// `STOR` loop blocked on a stalled peer periodically wakes up to recheck
/// `reactor::shutdown_requested` instead of blocking indefinitely.
const DATA_CHANNEL_IO_TIMEOUT: Duration = Duration::from_millis(200);

fn apply_io_timeout(stream: &TcpStream) {
    let _ = stream.set_read_timeout(Some(DATA_CHANNEL_IO_TIMEOUT));
    let _ = stream.set_write_timeout(Some(DATA_CHANNEL_IO_TIMEOUT));
}

trait IntoRawFdExt {
    fn into_raw_fd(self) -> RawFd;
}

impl IntoRawFdExt for Socket {
    fn into_raw_fd(self) -> RawFd {
        std::os::fd::IntoRawFd::into_raw_fd(self)
    }
}

impl IntoRawFdExt for TcpListener {
    fn into_raw_fd(self) -> RawFd {
        let fd = self.as_raw_fd();
        std::mem::forget(self);
        fd
    }
}

/// Obtains the [`TcpStream`] a transfer handler (`LIST`/`RETR`/`STOR`) should
/// use, opening an ACTIVE connection on demand if the session selected that
/// mode but hasn't dialed out yet.
///
/// Clears `data_fd`/`listen_fd` on the session written back to `registry`:
/// the returned stream now owns the descriptor and closes it on drop once
/// the transfer completes.
///
/// # Errors
///
/// Returns [`ServerError::NoDataConnection`] if no data connection exists
/// and none can be opened yet (PASSIVE with no pending listener, or no mode
/// selected at all).
pub fn ensure_data_connection(
    registry: &SessionRegistry,
    data_port: u16,
    control_fd: RawFd,
) -> Result<TcpStream, ServerError> {
    let mut session = registry.lookup(control_fd)?;

    if let Some(fd) = session.data_fd.take() {
        registry.replace(control_fd, session)?;
        // SAFETY: `fd` was exclusively owned by the session we just replaced.
        #[allow(unsafe_code)]
        let stream = unsafe { TcpStream::from_raw_fd(fd) };
        apply_io_timeout(&stream);
        return Ok(stream);
    }

    match session.data_mode {
        Some(DataMode::Active) => {
            let (ip, port) = session
                .peer_data_addr
                .clone()
                .ok_or(ServerError::NoDataConnection)?;
            let fd = open_active(data_port, &ip, &port)?;
            registry.replace(control_fd, session)?;
            // SAFETY: `fd` was just created by `open_active` and not shared.
            #[allow(unsafe_code)]
            let stream = unsafe { TcpStream::from_raw_fd(fd) };
            apply_io_timeout(&stream);
            Ok(stream)
        }
        Some(DataMode::Passive) | None => Err(ServerError::NoDataConnection),
    }
}
