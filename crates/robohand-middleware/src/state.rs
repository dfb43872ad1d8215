//! Process-wide session state.
//!
//! [`SessionState`] holds the last accepted [`CommandVector`], the latest
//! heart rate and the session [`Mode`].  The vector and heart rate live in a
//! single immutable [`Snapshot`] that writers replace as a whole, so readers
//! always see a vector and a heart rate that belonged together.
//!
//! The Telemetry Reader owns the heart rate; the active input mode owns the
//! vector.  Anyone may read.
//!
//! # Example
//!
//! ```rust
//! use robohand_middleware::SessionState;
//! use robohand_types::{CommandVector, Mode};
//!
//! let state = SessionState::new();
//! state.set_heart_rate(72);
//! let snap = state.set_vector(CommandVector::OPEN);
//! assert_eq!(snap.heart_rate, 72);
//! assert_eq!(snap.update().fingers, CommandVector::OPEN);
//!
//! state.set_mode(Mode::Voice).unwrap();
//! assert!(state.set_mode(Mode::Camera).is_err());
//! ```

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use robohand_types::{CommandVector, HandError, Mode, StateUpdate};
use tokio::sync::watch;
use tracing::info;

/// One consistent view of the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Last vector accepted by the transport.
    pub vector: CommandVector,
    /// Latest heart rate reported by the board; 0 until the first reading.
    pub heart_rate: i32,
    /// When this snapshot replaced the previous one.
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    /// The observer-facing form of this snapshot.
    pub fn update(&self) -> StateUpdate {
        StateUpdate {
            fingers: self.vector,
            bpm: self.heart_rate,
        }
    }
}

/// Shared live state for one process run.
pub struct SessionState {
    current: watch::Sender<Snapshot>,
    mode: OnceLock<Mode>,
}

impl SessionState {
    pub fn new() -> Self {
        let (current, _) = watch::channel(Snapshot {
            vector: CommandVector::CLOSED,
            heart_rate: 0,
            updated_at: Utc::now(),
        });
        Self {
            current,
            mode: OnceLock::new(),
        }
    }

    /// A copy of the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        *self.current.borrow()
    }

    /// Replace the vector, keeping the heart rate.  Returns the new snapshot.
    pub fn set_vector(&self, vector: CommandVector) -> Snapshot {
        self.replace(|prev| Snapshot {
            vector,
            heart_rate: prev.heart_rate,
            updated_at: Utc::now(),
        })
    }

    /// Replace the heart rate, keeping the vector.  Returns the new snapshot.
    pub fn set_heart_rate(&self, heart_rate: i32) -> Snapshot {
        self.replace(|prev| Snapshot {
            vector: prev.vector,
            heart_rate,
            updated_at: Utc::now(),
        })
    }

    /// Receiver that is notified every time the snapshot is replaced.
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.current.subscribe()
    }

    /// The session mode, once chosen.
    pub fn mode(&self) -> Option<Mode> {
        self.mode.get().copied()
    }

    /// Fix the session mode.  It can be set exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::ModeAlreadySet`] carrying the existing mode.
    pub fn set_mode(&self, mode: Mode) -> Result<(), HandError> {
        self.mode.set(mode).map_err(|_| {
            HandError::ModeAlreadySet(self.mode().unwrap_or(mode))
        })?;
        info!(%mode, "session mode selected");
        Ok(())
    }

    fn replace(&self, next: impl FnOnce(&Snapshot) -> Snapshot) -> Snapshot {
        let mut replaced = None;
        self.current.send_modify(|snap| {
            let fresh = next(snap);
            *snap = fresh;
            replaced = Some(fresh);
        });
        replaced.unwrap_or_else(|| self.snapshot())
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
