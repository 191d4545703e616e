//! Socket-level end-to-end tests: each spins up a real [`ftp_server::Reactor`]
//! on an ephemeral port and drives it with real `TcpStream`s, mirroring the
//! reference daemon crate's own socket-level test style.
//!
//! `SIGINT` handling lives in `tests/sigint.rs` instead of here: it flips a
//! process-wide static with no reset API, so it needs a test binary of its
//! own rather than sharing a process with everything in this file.

use std::io::Read;
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ftp_core::ServerConfig;
use ftp_protocol::{DataBlock, Reply, Request};
use ftp_server::ServerError;
use logging_sink::LogSink;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

fn config(root: &Path, control_port: u16) -> ServerConfig {
    ServerConfig {
        log_file: None,
        threads_number: 4,
        control_port,
        data_port: 0,
        connection_queue_size: 16,
        root_directory: root.to_path_buf(),
        max_transfer_bytes: None,
        log_level: "error".to_string(),
    }
}

fn spawn_server(config: ServerConfig) -> JoinHandle<Result<(), ServerError>> {
    thread::spawn(move || ftp_server::run(config, LogSink::stdout()))
}

/// Connects to `port`, retrying with backoff, and panics early (with the
/// reactor's own error) if `handle` has already finished.
fn connect_with_retries(port: u16, handle: &JoinHandle<Result<(), ServerError>>) -> TcpStream {
    const INITIAL_BACKOFF: Duration = Duration::from_millis(20);
    const MAX_BACKOFF: Duration = Duration::from_millis(200);
    const TIMEOUT: Duration = Duration::from_secs(5);

    let target = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let deadline = Instant::now() + TIMEOUT;
    let mut backoff = INITIAL_BACKOFF;

    loop {
        if handle.is_finished() {
            panic!("reactor exited before accepting a connection on port {port}");
        }
        match TcpStream::connect_timeout(&target, backoff) {
            Ok(stream) => return stream,
            Err(error) => {
                if Instant::now() >= deadline {
                    panic!("failed to connect to reactor within timeout: {error}");
                }
                thread::sleep(backoff);
                backoff = (backoff.saturating_mul(2)).min(MAX_BACKOFF);
            }
        }
    }
}

fn connect_data(ip: &str, port: u16) -> TcpStream {
    let target: SocketAddr = format!("{ip}:{port}").parse().expect("parse data address");
    TcpStream::connect_timeout(&target, Duration::from_secs(5)).expect("connect to data channel")
}

fn send_command(stream: &mut TcpStream, line: &str) -> Reply {
    Request::new(line).send(stream).expect("send request");
    Reply::recv(stream).expect("recv reply")
}

fn parse_pasv_address(body: &str) -> (String, u16) {
    let (ip, port) = body.split_once(',').expect("PASV body has <ip>,<port>");
    (ip.to_string(), port.parse().expect("PASV port is numeric"))
}

#[test]
fn pwd_reflects_prior_cwd() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let port = free_port();
    let handle = spawn_server(config(dir.path(), port));
    let mut control = connect_with_retries(port, &handle);

    let greeting = Reply::recv(&mut control).unwrap();
    assert_eq!(greeting.code, 200);

    let reply = send_command(&mut control, "CWD sub");
    assert_eq!(reply.code, 200);
    assert_eq!(reply.body_str(), "sub");

    let reply = send_command(&mut control, "PWD");
    assert_eq!(reply.code, 200);
    assert!(
        reply.body_str().ends_with("/sub"),
        "expected PWD to end in /sub, got {}",
        reply.body_str()
    );
}

#[test]
fn stor_then_retr_round_trips_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    let port = free_port();
    let handle = spawn_server(config(dir.path(), port));
    let mut control = connect_with_retries(port, &handle);
    Reply::recv(&mut control).unwrap();

    let pasv_reply = send_command(&mut control, "PASV");
    assert_eq!(pasv_reply.code, 227);
    let (ip, data_port) = parse_pasv_address(&pasv_reply.body_str());

    let mut data = connect_data(&ip, data_port);
    DataBlock::new(b"AAAA".to_vec()).send(&mut data).unwrap();
    DataBlock::new(b"BBBB".to_vec()).send(&mut data).unwrap();
    DataBlock::final_block(b"CC".to_vec()).send(&mut data).unwrap();

    let reply = send_command(&mut control, "STOR round_trip.bin");
    assert_eq!(reply.code, 250, "STOR failed: {}", reply.body_str());
    drop(data);

    let pasv_reply = send_command(&mut control, "PASV");
    assert_eq!(pasv_reply.code, 227);
    let (ip, data_port) = parse_pasv_address(&pasv_reply.body_str());
    let mut data = connect_data(&ip, data_port);

    let reply = send_command(&mut control, "RETR round_trip.bin");
    assert_eq!(reply.code, 250, "RETR failed: {}", reply.body_str());

    let mut assembled = Vec::new();
    loop {
        let block = DataBlock::recv(&mut data).unwrap();
        assembled.extend_from_slice(&block.payload);
        if block.eof {
            break;
        }
    }
    assert_eq!(assembled, b"AAAABBBBCC");
}

#[test]
fn path_rejection_leaves_session_state_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let port = free_port();
    let handle = spawn_server(config(dir.path(), port));
    let mut control = connect_with_retries(port, &handle);
    Reply::recv(&mut control).unwrap();

    let reply = send_command(&mut control, "CWD ../etc");
    assert_eq!(reply.code, 501);

    let reply = send_command(&mut control, "PWD");
    assert_eq!(reply.code, 200);
    assert_eq!(reply.body_str(), dir.path().display().to_string());
}

#[test]
fn data_connection_aborted_before_use_yields_connection_closed() {
    let dir = tempfile::tempdir().unwrap();
    let port = free_port();
    let handle = spawn_server(config(dir.path(), port));
    let mut control = connect_with_retries(port, &handle);
    Reply::recv(&mut control).unwrap();

    let pasv_reply = send_command(&mut control, "PASV");
    assert_eq!(pasv_reply.code, 227);
    let (ip, data_port) = parse_pasv_address(&pasv_reply.body_str());

    {
        let data = connect_data(&ip, data_port);
        // SO_LINGER(0) makes the close send an RST instead of a graceful
        // FIN, so the server's next write on this descriptor fails
        // immediately instead of racing a half-closed socket.
        data.set_linger(Some(Duration::ZERO)).unwrap();
    }
    thread::sleep(Duration::from_millis(200));

    let reply = send_command(&mut control, "LIST");
    assert_eq!(
        reply.code, 426,
        "expected connection-closed, got {}: {}",
        reply.code,
        reply.body_str()
    );
}

#[test]
fn quit_sends_reply_then_closes_control_channel() {
    let dir = tempfile::tempdir().unwrap();
    let port = free_port();
    let handle = spawn_server(config(dir.path(), port));
    let mut control = connect_with_retries(port, &handle);
    Reply::recv(&mut control).unwrap();

    let reply = send_command(&mut control, "QUIT");
    assert_eq!(reply.code, 221);

    let mut buf = [0u8; 1];
    let n = control.read(&mut buf).unwrap();
    assert_eq!(n, 0, "expected the server to close the control channel after QUIT");
}
