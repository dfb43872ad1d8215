//! `robohand-runtime` – the control pipeline.
//!
//! Wires the perception stages to the serial link and keeps the session
//! state current.
//!
//! # Modules
//!
//! - [`context`] – [`SessionContext`]: shared transport, state, bus, stop
//!   flag and [`SessionSettings`].
//! - [`dispatcher`] – [`CommandDispatcher`]: the single, serialised
//!   write → record → publish path for every accepted command.
//! - [`telemetry_reader`] – [`TelemetryReader`]: background thread turning
//!   `#DATA:` lines into heart-rate updates.
//! - [`camera_session`] – gesture loop over a
//!   [`LandmarkSource`][robohand_perception::LandmarkSource].
//! - [`voice_session`] – background listening loop plus foreground
//!   [`FingerDisplay`][voice_session::FingerDisplay].
//! - [`arbiter`] – [`ModeArbiter`]: menu, mode selection and the
//!   Start → Session → Terminated state machine.
//! - [`logging`] – [`init_tracing`][logging::init_tracing]: `tracing`
//!   subscriber with optional OTLP export.
//!
//! # Threads
//!
//! The foreground session loop, the Telemetry Reader and (in voice mode) the
//! listening loop run on separate OS threads.  They share only the
//! [`SerialTransport`][robohand_hal::SerialTransport] (mutex-guarded halves),
//! the [`SessionState`][robohand_middleware::SessionState] (atomic snapshot
//! replacement) and the [`EventBus`][robohand_middleware::EventBus]
//! (non-blocking publish).

pub mod arbiter;
pub mod camera_session;
pub mod context;
pub mod dispatcher;
pub mod logging;
pub mod telemetry_reader;
pub mod voice_session;

pub use arbiter::{ArbiterState, ModeArbiter, parse_selection};
pub use camera_session::{CameraExit, CameraReport, run_camera_session};
pub use context::{SessionContext, SessionSettings};
pub use dispatcher::CommandDispatcher;
pub use logging::{TracerProviderGuard, init_tracing};
pub use telemetry_reader::TelemetryReader;
pub use voice_session::{FingerDisplay, VoiceExit, run_voice_session};
