//! Shared handles and tunables for one process run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use robohand_hal::SerialTransport;
use robohand_middleware::{EventBus, SessionState};
use robohand_perception::RetryPolicy;
use robohand_perception::gesture::DEFAULT_SEND_INTERVAL;

use crate::dispatcher::CommandDispatcher;

/// Timing and retry parameters of the session loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Minimum spacing between two gesture commands.
    pub send_interval: Duration,
    /// Pause after each camera frame.
    pub frame_delay: Duration,
    /// Refresh period of the voice-mode finger display.
    pub render_interval: Duration,
    /// Reaction to speech recognition failures.
    pub retry: RetryPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            send_interval: DEFAULT_SEND_INTERVAL,
            frame_delay: Duration::from_millis(20),
            render_interval: Duration::from_millis(33),
            retry: RetryPolicy::UNBOUNDED,
        }
    }
}

/// Everything a session needs, cheap to clone.
#[derive(Clone)]
pub struct SessionContext {
    pub transport: Arc<SerialTransport>,
    pub state: Arc<SessionState>,
    pub bus: EventBus,
    /// Raised by a quit signal (Ctrl-C, window close).  Checked once per
    /// loop iteration.
    pub stop: Arc<AtomicBool>,
    pub settings: SessionSettings,
    dispatcher: Arc<CommandDispatcher>,
}

impl SessionContext {
    pub fn new(
        transport: Arc<SerialTransport>,
        state: Arc<SessionState>,
        bus: EventBus,
        settings: SessionSettings,
    ) -> Self {
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::clone(&transport),
            Arc::clone(&state),
            bus.clone(),
        ));
        Self {
            transport,
            state,
            bus,
            stop: Arc::new(AtomicBool::new(false)),
            settings,
            dispatcher,
        }
    }

    /// The single command path shared by every producer.
    pub fn dispatcher(&self) -> Arc<CommandDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Ask the running session loops to wind down.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}
