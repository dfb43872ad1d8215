//! Voice session: transcripts → Voice Command Interpreter → dispatcher.
//!
//! The listening loop runs on a background thread.  The foreground renders
//! the current vector through a [`FingerDisplay`] until the loop finishes
//! (the speaker said `stop`, the audio stream ended, the retry policy gave
//! up) or a quit signal is raised.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use robohand_middleware::{SessionState, Snapshot};
use robohand_perception::{RetryPolicy, TranscriptSource, VoiceCommand, interpret};
use robohand_types::{CommandSink, StateUpdate};
use tracing::{debug, error, info, warn};

use crate::context::SessionSettings;

/// Why a voice session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceExit {
    /// The speaker said the stop keyword.
    StopKeyword,
    /// The transcript source has no more utterances.
    SourceEnded,
    /// The retry policy gave up after repeated recognition failures.
    GaveUp,
    /// A quit signal was raised.
    Cancelled,
}

/// Something that shows the current finger state to the operator.
pub trait FingerDisplay {
    fn render(&mut self, snapshot: &Snapshot);
}

/// Listen and interpret until told to stop.
pub fn run_voice_loop(
    source: &mut dyn TranscriptSource,
    sink: &dyn CommandSink,
    policy: RetryPolicy,
    stop: &AtomicBool,
) -> VoiceExit {
    let mut failures: u32 = 0;
    loop {
        if stop.load(Ordering::SeqCst) {
            return VoiceExit::Cancelled;
        }
        match source.listen() {
            Ok(None) => return VoiceExit::SourceEnded,
            Ok(Some(transcript)) => {
                failures = 0;
                match interpret(&transcript) {
                    VoiceCommand::Stop => {
                        info!(%transcript, "stop keyword heard");
                        return VoiceExit::StopKeyword;
                    }
                    VoiceCommand::Fingers(vector) => {
                        if let Err(e) = sink.submit(vector) {
                            warn!(error = %e, %vector, "voice command not sent");
                        }
                    }
                }
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                debug!(error = %e, failures, "no command this cycle");
                match policy.next_delay(failures) {
                    None => {
                        warn!(failures, "giving up on speech recognition");
                        return VoiceExit::GaveUp;
                    }
                    Some(delay) if !delay.is_zero() => thread::sleep(delay),
                    Some(_) => {}
                }
            }
        }
    }
}

/// Run [`run_voice_loop`] on a background thread.
pub fn spawn_voice_loop(
    mut source: Box<dyn TranscriptSource>,
    sink: Arc<dyn CommandSink>,
    policy: RetryPolicy,
    stop: Arc<AtomicBool>,
) -> JoinHandle<VoiceExit> {
    thread::spawn(move || run_voice_loop(source.as_mut(), sink.as_ref(), policy, &stop))
}

/// Foreground half of a voice session.
///
/// Watches the session state and renders whenever the vector or heart rate
/// changes, checking every `settings.render_interval`, until the background
/// loop finishes or `stop` is raised.  On return `stop` is raised so a loop
/// still blocked in `listen` exits at its next iteration.
pub fn run_voice_session(
    source: Box<dyn TranscriptSource>,
    sink: Arc<dyn CommandSink>,
    state: &SessionState,
    display: &mut dyn FingerDisplay,
    settings: &SessionSettings,
    stop: Arc<AtomicBool>,
) -> VoiceExit {
    info!("voice session started");
    let listener = spawn_voice_loop(source, sink, settings.retry, Arc::clone(&stop));
    let mut changes = state.watch();
    let mut shown: Option<StateUpdate> = None;

    let exit = loop {
        if shown.is_none() || changes.has_changed().unwrap_or(false) {
            let snapshot = *changes.borrow_and_update();
            // Replacements that repeat the shown values are not redrawn.
            if shown != Some(snapshot.update()) {
                display.render(&snapshot);
                shown = Some(snapshot.update());
            }
        }
        if listener.is_finished() {
            break listener.join().unwrap_or_else(|_| {
                error!("voice loop panicked");
                VoiceExit::Cancelled
            });
        }
        if stop.load(Ordering::SeqCst) {
            break VoiceExit::Cancelled;
        }
        thread::sleep(settings.render_interval);
    };

    stop.store(true, Ordering::SeqCst);
    info!(exit = ?exit, "voice session ended");
    exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use robohand_types::{CommandVector, HandError};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Scripted(VecDeque<Result<Option<String>, HandError>>);

    impl Scripted {
        fn new(items: Vec<Result<Option<&str>, HandError>>) -> Self {
            Self(
                items
                    .into_iter()
                    .map(|r| r.map(|o| o.map(str::to_string)))
                    .collect(),
            )
        }
    }

    impl TranscriptSource for Scripted {
        fn listen(&mut self) -> Result<Option<String>, HandError> {
            self.0.pop_front().unwrap_or(Ok(None))
        }
    }

    /// Fails forever.
    struct Deaf;

    impl TranscriptSource for Deaf {
        fn listen(&mut self) -> Result<Option<String>, HandError> {
            Err(HandError::RecognitionFailure("silence".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<CommandVector>>);

    impl CommandSink for RecordingSink {
        fn submit(&self, vector: CommandVector) -> Result<(), HandError> {
            self.0.lock().unwrap().push(vector);
            Ok(())
        }
    }

    fn failure() -> Result<Option<&'static str>, HandError> {
        Err(HandError::RecognitionFailure("unintelligible".to_string()))
    }

    #[test]
    fn commands_until_stop() {
        let mut src = Scripted::new(vec![
            Ok(Some("ouvre la main")),
            failure(),
            Ok(Some("lève l'index et le majeur")),
            Ok(Some("stop")),
            Ok(Some("ferme")),
        ]);
        let sink = RecordingSink::default();
        let stop = AtomicBool::new(false);

        let exit = run_voice_loop(&mut src, &sink, RetryPolicy::UNBOUNDED, &stop);

        assert_eq!(exit, VoiceExit::StopKeyword);
        let sent: Vec<String> = sink.0.lock().unwrap().iter().map(|v| v.to_string()).collect();
        assert_eq!(sent, vec!["11111", "01100"]);
        // Nothing after "stop" was consumed.
        assert_eq!(src.0.len(), 1);
    }

    #[test]
    fn source_end_finishes_loop() {
        let mut src = Scripted::new(vec![Ok(Some("rien"))]);
        let sink = RecordingSink::default();
        let exit = run_voice_loop(&mut src, &sink, RetryPolicy::UNBOUNDED, &AtomicBool::new(false));
        assert_eq!(exit, VoiceExit::SourceEnded);
        assert_eq!(sink.0.lock().unwrap().as_slice(), &[CommandVector::CLOSED]);
    }

    #[test]
    fn bounded_policy_gives_up_on_deaf_source() {
        let policy = RetryPolicy {
            backoff: Duration::ZERO,
            max_consecutive_failures: Some(5),
        };
        let exit = run_voice_loop(
            &mut Deaf,
            &RecordingSink::default(),
            policy,
            &AtomicBool::new(false),
        );
        assert_eq!(exit, VoiceExit::GaveUp);
    }

    #[test]
    fn success_resets_failure_count() {
        let policy = RetryPolicy {
            backoff: Duration::ZERO,
            max_consecutive_failures: Some(2),
        };
        let mut src = Scripted::new(vec![
            failure(),
            Ok(Some("pouce")),
            failure(),
            Ok(Some("index")),
        ]);
        let sink = RecordingSink::default();
        let exit = run_voice_loop(&mut src, &sink, policy, &AtomicBool::new(false));
        assert_eq!(exit, VoiceExit::SourceEnded);
        assert_eq!(sink.0.lock().unwrap().len(), 2);
    }

    #[test]
    fn stop_flag_cancels_unbounded_retry() {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_voice_loop(
            Box::new(Deaf),
            Arc::new(RecordingSink::default()),
            RetryPolicy::UNBOUNDED,
            Arc::clone(&stop),
        );
        thread::sleep(Duration::from_millis(20));
        stop.store(true, Ordering::SeqCst);
        assert_eq!(handle.join().unwrap(), VoiceExit::Cancelled);
    }

    struct CountingDisplay(Vec<String>);

    impl FingerDisplay for CountingDisplay {
        fn render(&mut self, snapshot: &Snapshot) {
            self.0.push(snapshot.vector.to_string());
        }
    }

    /// Sink that records into the session state, like the real dispatcher.
    struct StateSink(Arc<SessionState>);

    impl CommandSink for StateSink {
        fn submit(&self, vector: CommandVector) -> Result<(), HandError> {
            self.0.set_vector(vector);
            Ok(())
        }
    }

    #[test]
    fn foreground_renders_until_stop_keyword() {
        let state = Arc::new(SessionState::new());
        let stop = Arc::new(AtomicBool::new(false));
        let mut display = CountingDisplay(Vec::new());
        let settings = SessionSettings {
            render_interval: Duration::from_millis(1),
            ..SessionSettings::default()
        };

        let exit = run_voice_session(
            Box::new(Scripted::new(vec![Ok(Some("six")), Ok(Some("stop"))])),
            Arc::new(StateSink(Arc::clone(&state))),
            &state,
            &mut display,
            &settings,
            Arc::clone(&stop),
        );

        assert_eq!(exit, VoiceExit::StopKeyword);
        assert!(stop.load(Ordering::SeqCst));
        assert!(!display.0.is_empty());
        assert_eq!(state.snapshot().vector, CommandVector::OPEN);
    }

    #[test]
    fn foreground_quit_signal_cancels() {
        let state = SessionState::new();
        let stop = Arc::new(AtomicBool::new(true));
        let mut display = CountingDisplay(Vec::new());
        let exit = run_voice_session(
            Box::new(Deaf),
            Arc::new(RecordingSink::default()),
            &state,
            &mut display,
            &SessionSettings::default(),
            stop,
        );
        assert_eq!(exit, VoiceExit::Cancelled);
        assert_eq!(display.0.len(), 1);
    }

    #[test]
    fn repeated_values_are_not_redrawn() {
        let state = Arc::new(SessionState::new());
        let stop = Arc::new(AtomicBool::new(false));
        let mut display = CountingDisplay(Vec::new());
        let settings = SessionSettings {
            render_interval: Duration::from_millis(1),
            ..SessionSettings::default()
        };

        // Both utterances close the hand, which is what is already shown.
        let exit = run_voice_session(
            Box::new(Scripted::new(vec![
                Ok(Some("ferme")),
                Ok(Some("ferme le poing")),
                Ok(Some("stop")),
            ])),
            Arc::new(StateSink(Arc::clone(&state))),
            &state,
            &mut display,
            &settings,
            stop,
        );

        assert_eq!(exit, VoiceExit::StopKeyword);
        assert_eq!(display.0, vec!["00000".to_string()]);
    }
}
