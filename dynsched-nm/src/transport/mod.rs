/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Line-oriented transport over the coordinator's serial link.
//!
//! The serial device is one duplex resource shared by two loops, but the
//! sharing contract is strict: the scheduler loop is the *sole writer* and
//! the log loop is the *sole reader*.  [`open_serial`] encodes that split in
//! the types — it opens the device once and hands back independent writer
//! and reader halves, so no locking is ever needed.
//!
//! The seam is a pair of one-method traits ([`WriteLine`] / [`ReadLine`])
//! rather than a concrete port type, which keeps the session loops testable
//! against in-memory doubles.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use thiserror::Error;
use tracing::{debug, info};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Transport failures.  Both variants are fatal to the session — a read
/// *timeout* is not an error and is reported as `Ok(None)` by
/// [`ReadLine::read_line`] instead.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The serial device could not be opened.
    #[error("cannot open serial device '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    /// A read or write on the open channel failed.
    #[error("serial I/O error: {0}")]
    Io(#[from] io::Error),
}

// ── Seam traits ───────────────────────────────────────────────────────────────

/// Write half of the duplex channel: one command per line.
pub trait WriteLine: Send {
    /// Write `line` followed by CRLF and flush it out.
    fn write_line(&mut self, line: &str) -> Result<(), TransportError>;
}

/// Read half of the duplex channel: one log line per call, bounded by the
/// device's configured read timeout.
pub trait ReadLine: Send {
    /// Block until one complete line arrives or the read timeout elapses.
    ///
    /// * `Ok(Some(line))` — a complete line, terminator trimmed.
    /// * `Ok(None)` — the timeout elapsed with no complete line; the caller
    ///   re-checks its shutdown flag and retries.  Bytes of a partial line
    ///   are retained for the next call.
    /// * `Err(_)` — the channel failed; no further reads will succeed.
    fn read_line(&mut self) -> Result<Option<String>, TransportError>;
}

// ── LineWriter ────────────────────────────────────────────────────────────────

/// [`WriteLine`] over any byte sink.
///
/// The CRLF terminator is appended here — it is part of the transport
/// framing, not of the serialized command (see [`crate::wire`]).
pub struct LineWriter<W: Write> {
    inner: W,
}

impl<W: Write> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write + Send> WriteLine for LineWriter<W> {
    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(b"\r\n")?;
        self.inner.flush()?;
        debug!(bytes = line.len() + 2, "wrote command line");
        Ok(())
    }
}

// ── LineReader ────────────────────────────────────────────────────────────────

/// [`ReadLine`] over any byte source with a read timeout.
///
/// A timeout can fire in the middle of a line; the bytes received so far are
/// kept in `partial` and the line is completed on a later call.  Dropping
/// them would corrupt the log stream the matcher scans.
pub struct LineReader<R: Read> {
    inner: BufReader<R>,
    partial: String,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            partial: String::new(),
        }
    }
}

impl<R: Read + Send> ReadLine for LineReader<R> {
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        match self.inner.read_line(&mut self.partial) {
            // A zero-byte read (EOF on the descriptor) behaves like a
            // timeout: nothing arrived this iteration, the caller re-checks
            // its shutdown flag and retries.
            Ok(0) => Ok(None),
            Ok(_) => {
                // read_line returns on '\n' or on EOF; only hand the line
                // out once it is actually terminated.
                if self.partial.ends_with('\n') {
                    let line = self.partial.trim_end_matches(['\r', '\n']).to_string();
                    self.partial.clear();
                    Ok(Some(line))
                } else {
                    Ok(None)
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            // Line noise on the wire shows up as invalid UTF-8.  The garbled
            // line cannot carry a measurement; discard it and keep reading.
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                debug!("discarding non-UTF-8 input");
                self.partial.clear();
                Ok(None)
            }
            // Interrupted reads may have appended bytes to `partial`; they
            // stay there and the next call carries on.
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}

// ── Serial device ─────────────────────────────────────────────────────────────

/// Writer and reader halves over one open serial device.
pub type SerialWriter = LineWriter<Box<dyn SerialPort>>;
pub type SerialReader = LineReader<Box<dyn SerialPort>>;

/// Open the named serial device and split it into its single-writer /
/// single-reader halves.
///
/// `read_timeout` bounds every blocking read so the log loop can observe the
/// shutdown flag between attempts; writes use the same port timeout.
///
/// # Errors
/// Fails if the device cannot be opened or the handle cannot be cloned for
/// the second half.  Open failure is fatal to the session — there is no
/// retry path.
pub fn open_serial(
    path: &str,
    baud_rate: u32,
    read_timeout: Duration,
) -> Result<(SerialWriter, SerialReader), TransportError> {
    let port = serialport::new(path, baud_rate)
        .timeout(read_timeout)
        .open()
        .map_err(|source| TransportError::Open {
            path: path.to_string(),
            source,
        })?;

    let reader_half = port.try_clone().map_err(|source| TransportError::Open {
        path: path.to_string(),
        source,
    })?;

    info!(
        device = path,
        baud = baud_rate,
        timeout_s = read_timeout.as_secs(),
        "serial device open"
    );

    Ok((LineWriter::new(port), LineReader::new(reader_half)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
