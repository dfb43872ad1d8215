//! [`SerialTransport`] – sole owner of the microcontroller link.
//!
//! Every byte to or from the robotic hand passes through this type.  The link
//! is split into two halves that share the same device:
//!
//! * the **write half** sits behind its own mutex, so concurrent producers can
//!   never interleave bytes of two frames;
//! * the **read half** sits behind a second mutex together with the partial
//!   line buffered so far, so a blocking read never holds up a write.
//!
//! Reads are bounded by the link's timeout and surface as
//! [`ReadOutcome::Timeout`] instead of blocking forever.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use robohand_types::{CommandVector, HandError};
use serialport::SerialPort;
use tracing::{debug, info, instrument};

use crate::frame::encode_frame;

/// Result of a single bounded line read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// One complete line, trimmed of surrounding whitespace.
    Line(String),
    /// Nothing complete arrived within the read timeout.
    Timeout,
    /// The link has been closed or the device hung up.
    Closed,
}

struct LineReader {
    inner: BufReader<Box<dyn Read + Send>>,
    /// Bytes of a line that was cut off by a timeout.
    pending: Vec<u8>,
}

impl LineReader {
    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        line
    }
}

/// Exclusive owner of the serial connection to the hand.
pub struct SerialTransport {
    port: String,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    reader: Mutex<Option<LineReader>>,
    closed: AtomicBool,
}

impl SerialTransport {
    /// Open `port` at `baud`, then wait `settle` for the board to come out of
    /// the reset triggered by opening the port.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::LinkUnavailable`] when the device cannot be opened
    /// or its handle cannot be split into read and write halves.
    #[instrument(skip(read_timeout, settle))]
    pub fn open(
        port: &str,
        baud: u32,
        read_timeout: Duration,
        settle: Duration,
    ) -> Result<Self, HandError> {
        let unavailable = |e: serialport::Error| HandError::LinkUnavailable {
            port: port.to_string(),
            details: e.to_string(),
        };

        let device = serialport::new(port, baud)
            .timeout(read_timeout)
            .open()
            .map_err(unavailable)?;
        let read_half = device.try_clone().map_err(unavailable)?;

        std::thread::sleep(settle);
        info!(port, baud, "serial link open");

        Ok(Self::from_parts(
            port,
            DeviceHalf(read_half),
            DeviceHalf(device),
        ))
    }

    /// Build a transport over arbitrary read and write halves of one link.
    ///
    /// The reader must return [`io::ErrorKind::TimedOut`] (or `WouldBlock`)
    /// when no data arrives in time, the way a serial port does.
    pub fn from_parts(
        port: impl Into<String>,
        reader: impl Read + Send + 'static,
        writer: impl Write + Send + 'static,
    ) -> Self {
        Self {
            port: port.into(),
            writer: Mutex::new(Some(Box::new(writer))),
            reader: Mutex::new(Some(LineReader {
                inner: BufReader::new(Box::new(reader)),
                pending: Vec::new(),
            })),
            closed: AtomicBool::new(false),
        }
    }

    /// Identifier of the underlying device.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Frame `vector` and write it to the link as one write.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::Transport`] if the link is closed or the write
    /// fails.  The link may recover, so callers log and keep going.
    pub fn send(&self, vector: CommandVector) -> Result<(), HandError> {
        let frame = encode_frame(vector);
        let mut guard = lock(&self.writer);
        let writer = guard
            .as_mut()
            .ok_or_else(|| HandError::Transport(format!("{} is closed", self.port)))?;
        writer
            .write_all(&frame)
            .and_then(|()| writer.flush())
            .map_err(|e| HandError::Transport(format!("write to {} failed: {e}", self.port)))?;
        debug!(port = %self.port, frame = %vector, "frame sent");
        Ok(())
    }

    /// Read one newline-terminated line, waiting at most the link timeout.
    ///
    /// A line cut in half by a timeout is kept and completed by the next call.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::Transport`] on a read fault other than a timeout.
    pub fn read_line(&self) -> Result<ReadOutcome, HandError> {
        let mut guard = lock(&self.reader);
        if self.closed.load(Ordering::SeqCst) {
            guard.take();
        }
        let Some(reader) = guard.as_mut() else {
            return Ok(ReadOutcome::Closed);
        };

        match reader.inner.read_until(b'\n', &mut reader.pending) {
            Ok(0) if reader.pending.is_empty() => Ok(ReadOutcome::Closed),
            // Either a full line or the final unterminated one before EOF.
            Ok(_) => Ok(ReadOutcome::Line(reader.take_line())),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(ReadOutcome::Timeout)
            }
            Err(e) => Err(HandError::Transport(format!(
                "read from {} failed: {e}",
                self.port
            ))),
        }
    }

    /// Release the device.  Calling this more than once is harmless.
    ///
    /// A reader blocked inside [`read_line`](Self::read_line) drops its half
    /// on its next call.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.writer).take();
        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }
        info!(port = %self.port, "serial link closed");
    }

    /// `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One handle onto an opened serial device.
struct DeviceHalf(Box<dyn SerialPort>);

impl Read for DeviceHalf {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for DeviceHalf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
