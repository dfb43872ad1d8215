//! `robohand-cockpit` – live dashboard for the hand.
//!
//! Boots a small HTTP + WebSocket server (default `0.0.0.0:5000`) that:
//!
//! 1. **Serves** the embedded dashboard page at every non-WebSocket path.
//! 2. **Pushes** every [`StateUpdate`] published on the [`EventBus`] to each
//!    connected browser as a JSON text frame:
//!    `{"fingers":"10101","bpm":72}`.
//!
//! Observers are read-only; anything a browser sends is ignored.
//!
//! # Usage
//!
//! ```rust,no_run
//! use robohand_middleware::EventBus;
//! use robohand_cockpit::CockpitServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = EventBus::default();
//!     if let Err(e) = CockpitServer::new(bus.clone()).run().await {
//!         eprintln!("{e}");
//!     }
//! }
//! ```
//!
//! [`StateUpdate`]: robohand_types::StateUpdate
//! [`EventBus`]: robohand_middleware::EventBus

pub mod server;

pub use server::{CockpitServer, DEFAULT_HOST, DEFAULT_PORT};
