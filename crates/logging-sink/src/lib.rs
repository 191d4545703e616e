#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging-sink` is the line-buffered, lock-serialized writer behind every
//! `tracing` call the reactor, registry, and handlers make. It is the
//! first-party stand-in for what would otherwise be an external log
//! collaborator: a single destination (stdout, or a file) that every
//! logging thread writes a complete line to under one mutex, so lines from
//! concurrent workers never interleave mid-write.
//!
//! # Design
//!
//! [`LogSink`] implements [`tracing_subscriber::fmt::MakeWriter`], so it
//! plugs directly into a `fmt` layer as the writer; [`LogSink::record`] and
//! [`LogSink::flush`] additionally expose the plain `record(level, text)`/
//! `flush()` surface callers can reach for outside of a `tracing` macro call
//! (for example, a handler logging an errno translation it already
//! formatted).
//!
//! # Invariants
//!
//! - Every line written through a given [`LogSink`] clone is fully written
//!   before another writer acquires the lock; lines never interleave.
//! - [`LogSink::flush`] blocks until all buffered bytes reach the
//!   underlying descriptor.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

enum Destination {
    Stdout(Stdout),
    File(BufWriter<File>),
}

impl Write for Destination {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(stdout) => stdout.write(buf),
            Self::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(stdout) => stdout.flush(),
            Self::File(file) => file.flush(),
        }
    }
}

/// A cloneable handle to a single, mutex-serialized log destination.
#[derive(Clone)]
pub struct LogSink {
    inner: Arc<Mutex<Destination>>,
}

impl LogSink {
    /// Builds a sink that writes to the process's standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Destination::Stdout(io::stdout()))),
        }
    }

    /// Builds a sink that appends to the file at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns any [`io::Error`] from opening `path`.
    pub fn to_file(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Destination::File(BufWriter::new(file)))),
        })
    }

    /// Writes one complete log line: `[{level}] {text}`, newline-terminated.
    ///
    /// The whole line is written while holding the lock, so it cannot
    /// interleave with a line written concurrently by another thread.
    pub fn record(&self, level: &str, text: &str) {
        let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = writeln!(guard, "[{level}] {text}");
    }

    /// Flushes buffered output to the underlying destination.
    pub fn flush(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = guard.flush();
    }
}

/// A single checked-out writer over a [`LogSink`]'s shared destination.
///
/// Returned by [`LogSink::make_writer`]; every write acquires the sink's
/// lock for its duration.
pub struct SinkWriter {
    inner: Arc<Mutex<Destination>>,
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.flush()
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;

    #[test]
    fn record_appends_level_and_text_with_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let sink = LogSink::to_file(&path).unwrap();
        sink.record("info", "session accepted");
        sink.flush();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "[info] session accepted\n");
    }

    #[test]
    fn concurrent_records_never_interleave_mid_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let sink = LogSink::to_file(&path).unwrap();

        thread::scope(|scope| {
            for worker in 0..8 {
                let sink = sink.clone();
                scope.spawn(move || {
                    for _ in 0..50 {
                        sink.record("info", &"x".repeat(40 + worker));
                    }
                });
            }
        });
        sink.flush();

        let contents = fs::read_to_string(&path).unwrap();
        for line in contents.lines() {
            assert!(line.starts_with("[info] "));
        }
        assert_eq!(contents.lines().count(), 400);
    }

    #[test]
    fn make_writer_round_trips_through_tracing_subscriber_write_api() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let sink = LogSink::to_file(&path).unwrap();

        let mut writer = sink.make_writer();
        writer.write_all(b"raw bytes\n").unwrap();
        writer.flush().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "raw bytes\n");
    }
}
