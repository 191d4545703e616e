//! Entry point: parses the properties-file argument, builds a
//! [`ftp_core::ServerConfig`], wires up logging, and runs the reactor
//! until it shuts down or a startup step fails.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ftp_core::ServerConfig;
use logging_sink::LogSink;
use tracing_subscriber::EnvFilter;

/// Concurrent multi-threaded FTP server daemon.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to the server's properties file.
    properties_file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = run(&cli);
    if let Err(message) = &result {
        eprintln!("ftpd: {message}");
    }
    exit_code_from(&result)
}

fn run(cli: &Cli) -> Result<(), String> {
    let config =
        ServerConfig::from_properties(&cli.properties_file).map_err(|err| err.to_string())?;

    let log = build_log_sink(&config)?;
    install_tracing(&config, log.clone());

    tracing::info!(
        control_port = config.control_port,
        data_port = config.data_port,
        threads = config.threads_number,
        root = %config.root_directory.display(),
        "starting ftpd"
    );

    ftp_server::run(config, log).map_err(|err| err.to_string())
}

fn build_log_sink(config: &ServerConfig) -> Result<LogSink, String> {
    match &config.log_file {
        Some(path) => LogSink::to_file(path)
            .map_err(|err| format!("failed to open log file {}: {err}", path.display())),
        None => Ok(LogSink::stdout()),
    }
}

fn install_tracing(config: &ServerConfig, log: LogSink) {
    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log)
        .init();
}

/// Translates a startup/run result into the process exit code: 0 on a
/// clean shutdown, 1 on any failure.
fn exit_code_from(result: &Result<(), String>) -> ExitCode {
    if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
