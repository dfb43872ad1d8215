//! [`TelemetryReader`] – background consumer of the link's read side.
//!
//! Drains lines from the [`SerialTransport`] for the whole process lifetime
//! and keeps the session heart rate current.  Anything that is not a valid
//! `#DATA:` line is serial noise and is dropped without complaint.  The
//! reader never writes to the link.
//!
//! The loop ends when the transport reports the link closed.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use robohand_hal::{ReadOutcome, SerialTransport, parse_telemetry};
use robohand_middleware::SessionState;
use tracing::{info, trace, warn};

/// Pause after a read fault so a persistently broken link does not spin.
const FAULT_PAUSE: Duration = Duration::from_millis(100);

pub struct TelemetryReader {
    transport: Arc<SerialTransport>,
    state: Arc<SessionState>,
}

impl TelemetryReader {
    pub fn new(transport: Arc<SerialTransport>, state: Arc<SessionState>) -> Self {
        Self { transport, state }
    }

    /// Run [`run`](Self::run) on a dedicated thread.
    pub fn spawn(self) -> JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    /// Read until the link closes.
    pub fn run(&self) {
        info!(port = self.transport.port(), "telemetry reader started");
        loop {
            match self.transport.read_line() {
                Ok(ReadOutcome::Line(line)) => {
                    self.apply_line(&line);
                }
                Ok(ReadOutcome::Timeout) => continue,
                Ok(ReadOutcome::Closed) => break,
                Err(e) => {
                    warn!(error = %e, "telemetry read failed");
                    thread::sleep(FAULT_PAUSE);
                }
            }
        }
        info!("telemetry reader stopped");
    }

    /// Update the heart rate from `line` if it is a telemetry frame.
    /// Returns the new heart rate, or `None` for noise.
    pub fn apply_line(&self, line: &str) -> Option<i32> {
        match parse_telemetry(line) {
            Ok(bpm) => {
                self.state.set_heart_rate(bpm);
                trace!(bpm, "heart rate updated");
                Some(bpm)
            }
            Err(e) => {
                trace!(error = %e, "ignored serial line");
                None
            }
        }
    }
}
