//! `robohand-middleware` – shared state and update routing.
//!
//! Carries live state between the producers (gesture and voice loops, the
//! Telemetry Reader) and the observers (dashboard, terminal display) without
//! caring where the data came from.
//!
//! # Modules
//!
//! - [`state`] – [`SessionState`]: the latest vector and heart rate as one
//!   atomically replaced [`Snapshot`], plus the write-once session mode.
//! - [`bus`] – [`EventBus`]: Tokio broadcast channel delivering one
//!   [`StateUpdate`][robohand_types::StateUpdate] per accepted command to
//!   every observer.

pub mod bus;
pub mod state;

pub use bus::{EventBus, UpdateSubscriber};
pub use state::{SessionState, Snapshot};
