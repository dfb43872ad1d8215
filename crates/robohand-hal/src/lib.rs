//! `robohand-hal` – the hardware boundary.
//!
//! Everything that touches the microcontroller link lives here.  The rest of
//! the system only sees [`SerialTransport`]'s narrow send / read-line
//! contract and never handles a device directly.
//!
//! # Modules
//!
//! - [`frame`] – the wire codec: 6-byte `$xxxxx` command frames and
//!   `#DATA:` telemetry lines.
//! - [`transport`] – [`SerialTransport`]: single owner of the link, with a
//!   mutex-guarded write half and a timeout-bounded line reader.
//! - [`sim`] – [`SimLink`][sim::SimLink]: an in-memory link for tests and
//!   for running without a board attached.

pub mod frame;
pub mod sim;
pub mod transport;

pub use frame::{FRAME_LEN, encode_frame, parse_telemetry};
pub use transport::{ReadOutcome, SerialTransport};
