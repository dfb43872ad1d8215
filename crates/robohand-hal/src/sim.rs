//! In-process simulated serial link for tests and hardware-free runs.
//!
//! [`SimLink`] behaves like an opened serial device: reads block for at most
//! the configured timeout and then fail with [`io::ErrorKind::TimedOut`],
//! writes are recorded, and inbound lines can be scripted from any thread.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use robohand_hal::sim::SimLink;
//! use robohand_hal::transport::ReadOutcome;
//! use robohand_types::CommandVector;
//!
//! let link = SimLink::new(Duration::from_millis(10));
//! let transport = link.transport();
//!
//! transport.send(CommandVector::OPEN).unwrap();
//! assert_eq!(link.frames(), vec![CommandVector::OPEN]);
//!
//! link.push_line("#DATA:64,0");
//! assert_eq!(
//!     transport.read_line().unwrap(),
//!     ReadOutcome::Line("#DATA:64,0".to_string())
//! );
//! ```

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use robohand_types::CommandVector;
use tracing::warn;

use crate::frame::{FRAME_LEN, TELEMETRY_MARKER, decode_frame};
use crate::transport::SerialTransport;

/// Device name reported by transports built on a [`SimLink`].
pub const SIM_PORT: &str = "sim";

#[derive(Default)]
struct SimState {
    inbound: VecDeque<u8>,
    written: Vec<u8>,
    fail_writes: bool,
    fail_next_read: bool,
    hung_up: bool,
}

struct SimShared {
    state: Mutex<SimState>,
    inbound_ready: Condvar,
    read_timeout: Duration,
}

/// A simulated microcontroller link.  Clones share the same device.
#[derive(Clone)]
pub struct SimLink {
    shared: Arc<SimShared>,
}

impl SimLink {
    /// Create a link whose reads give up after `read_timeout`.
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(SimShared {
                state: Mutex::new(SimState::default()),
                inbound_ready: Condvar::new(),
                read_timeout,
            }),
        }
    }

    /// Build a [`SerialTransport`] whose halves both point at this link.
    pub fn transport(&self) -> SerialTransport {
        SerialTransport::from_parts(SIM_PORT, self.clone(), self.clone())
    }

    /// Queue `line` (a newline is appended) as if the board had printed it.
    pub fn push_line(&self, line: &str) {
        let mut state = self.state();
        state.inbound.extend(line.as_bytes());
        state.inbound.push_back(b'\n');
        self.shared.inbound_ready.notify_all();
    }

    /// Every byte written so far.
    pub fn written(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    /// The written bytes decoded as frames.  A trailing partial frame or a
    /// chunk that does not decode is skipped.
    pub fn frames(&self) -> Vec<CommandVector> {
        self.written()
            .chunks(FRAME_LEN)
            .filter_map(|chunk| decode_frame(chunk).ok())
            .collect()
    }

    /// Make subsequent writes fail (`true`) or succeed again (`false`).
    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Make the next read fail with a non-timeout I/O error.
    pub fn inject_read_fault(&self) {
        self.state().fail_next_read = true;
        self.shared.inbound_ready.notify_all();
    }

    /// Simulate the board disappearing: pending reads see end-of-stream.
    pub fn hang_up(&self) {
        self.state().hung_up = true;
        self.shared.inbound_ready.notify_all();
    }

    /// `true` after [`hang_up`](Self::hang_up).
    pub fn is_hung_up(&self) -> bool {
        self.state().hung_up
    }

    /// Spawn a thread that prints a `#DATA:<bpm>,0` line every `period`,
    /// cycling through `bpm_values`, until the link is hung up.
    pub fn spawn_heartbeat(&self, bpm_values: Vec<i32>, period: Duration) -> JoinHandle<()> {
        let link = self.clone();
        thread::spawn(move || {
            if bpm_values.is_empty() {
                warn!("sim heartbeat started without values");
                return;
            }
            for bpm in bpm_values.iter().cycle() {
                if link.is_hung_up() {
                    break;
                }
                link.push_line(&format!("{TELEMETRY_MARKER}{bpm},0"));
                thread::sleep(period);
            }
        })
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Read for SimLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let state = self.state();
        let (mut state, _) = self
            .shared
            .inbound_ready
            .wait_timeout_while(state, self.shared.read_timeout, |s| {
                s.inbound.is_empty() && !s.hung_up && !s.fail_next_read
            })
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(io::Error::other("sim read fault"));
        }
        if state.inbound.is_empty() {
            return if state.hung_up {
                Ok(0)
            } else {
                Err(io::Error::new(io::ErrorKind::TimedOut, "sim read timed out"))
            };
        }
        let n = buf.len().min(state.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for SimLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.fail_writes || state.hung_up {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sim link unplugged"));
        }
        state.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
