//! [`CommandDispatcher`] – the one path from a producer to the hand.
//!
//! A command is accepted when the transport writes it.  Only then is the
//! session snapshot replaced and exactly one
//! [`StateUpdate`][robohand_types::StateUpdate] published.  A failed write
//! changes nothing and is reported to the caller.
//!
//! The whole write → record → publish sequence runs under one lock, so two
//! producers can never leave the wire, the snapshot and the observers
//! disagreeing about which vector came last.

use std::sync::{Arc, Mutex};

use robohand_hal::SerialTransport;
use robohand_middleware::{EventBus, SessionState};
use robohand_types::{CommandSink, CommandVector, HandError};
use tracing::debug;

pub struct CommandDispatcher {
    transport: Arc<SerialTransport>,
    state: Arc<SessionState>,
    bus: EventBus,
    order: Mutex<()>,
}

impl CommandDispatcher {
    pub fn new(transport: Arc<SerialTransport>, state: Arc<SessionState>, bus: EventBus) -> Self {
        Self {
            transport,
            state,
            bus,
            order: Mutex::new(()),
        }
    }
}

impl CommandSink for CommandDispatcher {
    fn submit(&self, vector: CommandVector) -> Result<(), HandError> {
        let _order = self
            .order
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        self.transport.send(vector)?;
        let snapshot = self.state.set_vector(vector);
        let observers = self.bus.publish(snapshot.update());
        debug!(
            %vector,
            bpm = snapshot.heart_rate,
            at = %snapshot.updated_at,
            observers,
            "command accepted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robohand_hal::sim::SimLink;
    use std::time::Duration;

    fn setup() -> (SimLink, Arc<SessionState>, EventBus, CommandDispatcher) {
        let link = SimLink::new(Duration::from_millis(10));
        let state = Arc::new(SessionState::new());
        let bus = EventBus::default();
        let dispatcher =
            CommandDispatcher::new(Arc::new(link.transport()), Arc::clone(&state), bus.clone());
        (link, state, bus, dispatcher)
    }

    #[test]
    fn accepted_command_is_written_recorded_and_published() {
        let (link, state, bus, dispatcher) = setup();
        let mut rx = bus.subscribe();
        state.set_heart_rate(77);

        let v: CommandVector = "01100".parse().unwrap();
        dispatcher.submit(v).unwrap();

        assert_eq!(link.written(), b"$01100".to_vec());
        assert_eq!(state.snapshot().vector, v);
        let update = rx.try_recv().expect("one update");
        assert_eq!(update.fingers, v);
        assert_eq!(update.bpm, 77);
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn failed_write_changes_nothing() {
        let (link, state, bus, dispatcher) = setup();
        let mut rx = bus.subscribe();
        link.set_fail_writes(true);

        let err = dispatcher.submit(CommandVector::OPEN).unwrap_err();
        assert!(matches!(err, HandError::Transport(_)));
        assert_eq!(state.snapshot().vector, CommandVector::CLOSED);
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn concurrent_producers_never_interleave_frames() {
        let (link, state, _bus, dispatcher) = setup();
        let dispatcher = Arc::new(dispatcher);
        let handles: Vec<_> = [CommandVector::OPEN, CommandVector::CLOSED]
            .into_iter()
            .map(|v| {
                let d = Arc::clone(&dispatcher);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        d.submit(v).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let written = link.written();
        assert_eq!(written.len(), 400 * robohand_hal::FRAME_LEN);
        let frames = link.frames();
        assert_eq!(frames.len(), 400);
        // The snapshot agrees with the last frame on the wire.
        assert_eq!(state.snapshot().vector, *frames.last().unwrap());
    }
}
