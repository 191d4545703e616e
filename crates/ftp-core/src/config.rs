//! The properties-file loader and the validated [`ServerConfig`] it produces.
//!
//! The loader itself stays deliberately naive — one `key=value` pair per
//! line, `#` comments, blank lines skipped. Everything that looks like
//! validation (range checks, required keys, path creation) happens once, in
//! [`ServerConfig::from_properties`], so the rest of the workspace only ever
//! sees a config that is already known to be sound.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_THREADS_NUMBER, MAX_THREADS_NUMBER, MIN_THREADS_NUMBER};

/// Failure building a [`ServerConfig`] from a properties file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The properties file could not be read.
    #[error("failed to read properties file {path}: {source}")]
    Read {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A line was not a `#` comment, blank, or a single `key=value` pair.
    #[error("malformed line {line_no} in {path}: {content:?}")]
    MalformedLine {
        /// Path of the offending properties file.
        path: PathBuf,
        /// 1-based line number.
        line_no: usize,
        /// Raw line content, for diagnostics.
        content: String,
    },

    /// A key required by [`ServerConfig`] was absent.
    #[error("missing required property: {0}")]
    MissingKey(&'static str),

    /// A key's value failed to parse as the type it's declared to hold.
    #[error("invalid value for property {key}: {value:?}")]
    InvalidValue {
        /// Offending property key.
        key: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },

    /// `root_directory` could not be created or entered.
    #[error("root directory {path} is not usable: {source}")]
    RootDirectory {
        /// Offending root directory path.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Parses a properties file into an ordered map of raw string key/value pairs.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] if the file can't be opened, or
/// [`ConfigError::MalformedLine`] for any non-blank, non-comment line
/// lacking a single `=` separator.
pub fn load_properties(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut properties = HashMap::new();
    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::MalformedLine {
                path: path.to_path_buf(),
                line_no: idx + 1,
                content: raw_line.to_string(),
            });
        };

        properties.insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(properties)
}

/// Validated server configuration, built from a properties file by
/// [`ServerConfig::from_properties`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Destination for log output; `None` means stdout.
    pub log_file: Option<PathBuf>,
    /// Number of worker threads servicing the task queue.
    pub threads_number: u16,
    /// TCP port the reactor listens on for control connections.
    pub control_port: u16,
    /// TCP port used as the local endpoint when opening ACTIVE data connections.
    pub data_port: u16,
    /// Backlog passed to `listen(2)` for the control listener.
    pub connection_queue_size: u32,
    /// Server root; every session's filesystem view is rooted here.
    pub root_directory: PathBuf,
    /// Optional cap, in bytes, on a single `STOR`'s total payload.
    pub max_transfer_bytes: Option<u64>,
    /// Minimum severity emitted by the logger, as a `tracing` filter directive.
    pub log_level: String,
}

impl ServerConfig {
    /// Loads and validates a [`ServerConfig`] from the properties file at `path`.
    ///
    /// Creates `root_directory` if it does not already exist, then `chdir`s
    /// the process into it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is unreadable or malformed, a
    /// required key is missing, a value fails to parse or falls outside its
    /// accepted range, or `root_directory` cannot be created or entered.
    pub fn from_properties(path: &Path) -> Result<Self, ConfigError> {
        let properties = load_properties(path)?;
        Self::from_map(&properties)
    }

    fn from_map(properties: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let log_file = properties
            .get("log_file")
            .map(String::as_str)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        let threads_number = match properties.get("threads_number") {
            None => DEFAULT_THREADS_NUMBER,
            Some(raw) => {
                let parsed: u16 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "threads_number",
                    value: raw.clone(),
                })?;
                if parsed < MIN_THREADS_NUMBER || parsed > MAX_THREADS_NUMBER {
                    return Err(ConfigError::InvalidValue {
                        key: "threads_number",
                        value: raw.clone(),
                    });
                }
                parsed
            }
        };

        let control_port = parse_required_u16(properties, "control_port")?;
        let data_port = parse_required_u16(properties, "data_port")?;

        let connection_queue_size = properties
            .get("connection_queue_size")
            .ok_or(ConfigError::MissingKey("connection_queue_size"))?
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "connection_queue_size",
                value: properties["connection_queue_size"].clone(),
            })?;

        let root_directory = properties
            .get("root_directory")
            .ok_or(ConfigError::MissingKey("root_directory"))?;
        let root_directory = PathBuf::from(root_directory);
        ensure_root_directory(&root_directory)?;

        let max_transfer_bytes = match properties.get("max_transfer_bytes") {
            None => None,
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "max_transfer_bytes",
                value: raw.clone(),
            })?),
        };

        let log_level = properties
            .get("log_level")
            .cloned()
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            log_file,
            threads_number,
            control_port,
            data_port,
            connection_queue_size,
            root_directory,
            max_transfer_bytes,
            log_level,
        })
    }
}

fn parse_required_u16(
    properties: &HashMap<String, String>,
    key: &'static str,
) -> Result<u16, ConfigError> {
    let raw = properties.get(key).ok_or(ConfigError::MissingKey(key))?;
    raw.parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw.clone(),
        })
}

fn ensure_root_directory(path: &Path) -> Result<(), ConfigError> {
    if !path.is_dir() {
        fs::create_dir_all(path).map_err(|source| ConfigError::RootDirectory {
            path: path.to_path_buf(),
            source,
        })?;
    }
    std::env::set_current_dir(path).map_err(|source| ConfigError::RootDirectory {
        path: path.to_path_buf(),
        source,
    })
}
