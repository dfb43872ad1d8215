//! Camera session: landmark frames → Gesture Normalizer → dispatcher.
//!
//! Runs synchronously on the caller's thread until the feed ends or a quit
//! signal is raised.  Each iteration processes one frame; classification
//! happens every frame, sending only when the throttle allows it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use robohand_perception::{FrameInput, FrameResult, GestureNormalizer, LandmarkSource};
use robohand_types::CommandSink;
use tracing::{debug, info, warn};

use crate::context::SessionSettings;

/// Why a camera session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraExit {
    /// The video feed ran out of frames.
    FeedEnded,
    /// A quit signal was observed.
    Quit,
}

/// Counters for one camera session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraReport {
    pub exit: CameraExit,
    pub frames: u64,
    pub hands: u64,
    pub sent: u64,
}

/// Drive the gesture pipeline until the feed ends or `stop` is raised.
pub fn run_camera_session(
    source: &mut dyn LandmarkSource,
    sink: &dyn CommandSink,
    settings: &SessionSettings,
    stop: &AtomicBool,
) -> CameraReport {
    let mut normalizer = GestureNormalizer::new(settings.send_interval);
    let mut report = CameraReport {
        exit: CameraExit::Quit,
        frames: 0,
        hands: 0,
        sent: 0,
    };
    info!("camera session started");

    loop {
        if stop.load(Ordering::SeqCst) {
            report.exit = CameraExit::Quit;
            break;
        }
        let hand = match source.next_frame() {
            Ok(FrameInput::Ended) => {
                report.exit = CameraExit::FeedEnded;
                break;
            }
            Ok(FrameInput::NoHand) => None,
            Ok(FrameInput::Hand(hand)) => Some(hand),
            Err(e) => {
                warn!(error = %e, "frame skipped");
                None
            }
        };
        report.frames += 1;

        if let Some(hand) = &hand {
            report.hands += 1;
            debug!(handedness = %hand.handedness(), "hand detected");
        }
        let result = normalizer.on_frame(hand.as_ref(), Instant::now(), sink);
        if let FrameResult::Sent(vector) = result {
            report.sent += 1;
            debug!(%vector, "gesture sent");
        }

        if !settings.frame_delay.is_zero() {
            thread::sleep(settings.frame_delay);
        }
    }

    info!(
        exit = ?report.exit,
        frames = report.frames,
        sent = report.sent,
        "camera session ended"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use robohand_perception::landmarks::{HandLandmarks, LANDMARK_COUNT, Landmark};
    use robohand_types::{CommandVector, HandError, Handedness};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedFeed(VecDeque<Result<FrameInput, HandError>>);

    impl LandmarkSource for ScriptedFeed {
        fn next_frame(&mut self) -> Result<FrameInput, HandError> {
            self.0.pop_front().unwrap_or(Ok(FrameInput::Ended))
        }
    }

    /// Never ends on its own.
    struct EndlessFeed;

    impl LandmarkSource for EndlessFeed {
        fn next_frame(&mut self) -> Result<FrameInput, HandError> {
            Ok(FrameInput::NoHand)
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

    fn flat_hand() -> HandLandmarks {
        HandLandmarks::new(Handedness::Right, [Landmark::new(0.5, 0.5); LANDMARK_COUNT])
    }

    fn fast_settings() -> SessionSettings {
        SessionSettings {
            frame_delay: Duration::ZERO,
            ..SessionSettings::default()
        }
    }

    #[test]
    fn feed_end_finishes_session() {
        let mut feed = ScriptedFeed(
            vec![
                Ok(FrameInput::NoHand),
                Ok(FrameInput::Hand(flat_hand())),
                Err(HandError::InvalidLandmarks("bad".to_string())),
                Ok(FrameInput::Hand(flat_hand())),
            ]
            .into(),
        );
        let sink = RecordingSink::default();
        let stop = AtomicBool::new(false);

        let report = run_camera_session(&mut feed, &sink, &fast_settings(), &stop);

        assert_eq!(report.exit, CameraExit::FeedEnded);
        assert_eq!(report.frames, 4);
        assert_eq!(report.hands, 2);
        // Two hands back to back: the second is inside the send interval.
        assert_eq!(report.sent, 1);
        assert_eq!(sink.0.lock().unwrap().as_slice(), &[CommandVector::CLOSED]);
    }

    #[test]
    fn quit_signal_stops_endless_feed() {
        let sink = RecordingSink::default();
        let stop = AtomicBool::new(true);
        let report = run_camera_session(&mut EndlessFeed, &sink, &fast_settings(), &stop);
        assert_eq!(report.exit, CameraExit::Quit);
        assert_eq!(report.frames, 0);
    }
}
