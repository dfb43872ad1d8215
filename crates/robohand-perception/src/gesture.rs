//! Gesture Normalizer: hand landmarks → [`CommandVector`], with send
//! throttling.
//!
//! # Algorithm
//!
//! Every frame is classified independently, without smoothing:
//!
//! * **Thumb** – the thumb bends sideways, so its tip (4) is compared to the
//!   joint just below it (3) on the x axis.  The direction depends on the
//!   hand: on a right hand the thumb is extended when the tip lies left of
//!   the joint (`tip.x < joint.x`), on a left hand when it lies right of it.
//! * **Other fingers** – each tip is compared to the joint two landmarks
//!   below it on the y axis.  Image y grows downwards, so the finger is
//!   extended when `tip.y < joint.y`.  Equality counts as curled.
//!
//! Classification runs on every frame but a vector is only submitted when at
//! least [`DEFAULT_SEND_INTERVAL`] has passed since the last submission.  A
//! rejected submission holds off the retry just like an accepted one, so
//! serial traffic stays at 10 writes per second whatever the camera frame
//! rate and whether or not the link is up.
//!
//! # Example
//!
//! ```rust
//! use robohand_perception::gesture::classify;
//! use robohand_perception::landmarks::{HandLandmarks, Landmark, LANDMARK_COUNT};
//! use robohand_types::Handedness;
//!
//! // A flat pose: every tip level with its joint, so nothing is extended.
//! let hand = HandLandmarks::new(Handedness::Right, [Landmark::new(0.5, 0.5); LANDMARK_COUNT]);
//! assert_eq!(classify(&hand).to_string(), "00000");
//! ```

use std::time::{Duration, Instant};

use robohand_types::{CommandSink, CommandVector, Finger, Handedness};
use tracing::{trace, warn};

use crate::landmarks::{FINGERTIPS, HandLandmarks};

/// Minimum spacing between two submissions.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(100);

/// Classify one detection into a command vector.
pub fn classify(hand: &HandLandmarks) -> CommandVector {
    let thumb_tip = hand.point(FINGERTIPS[0]);
    let thumb_joint = hand.point(FINGERTIPS[0] - 1);
    let thumb_out = match hand.handedness() {
        Handedness::Right => thumb_tip.x < thumb_joint.x,
        Handedness::Left => thumb_tip.x > thumb_joint.x,
    };

    let mut vector = CommandVector::CLOSED.with_finger(Finger::Thumb, thumb_out);
    for finger in &Finger::ALL[1..] {
        let tip_index = FINGERTIPS[finger.position()];
        let extended = hand.point(tip_index).y < hand.point(tip_index - 2).y;
        vector = vector.with_finger(*finger, extended);
    }
    vector
}

/// Tracks the last send attempt and decides whether another is allowed.
#[derive(Debug, Clone)]
pub struct SendThrottle {
    min_interval: Duration,
    last_attempt: Option<Instant>,
}

impl SendThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_attempt: None,
        }
    }

    /// `true` when nothing has been sent yet or `min_interval` has elapsed.
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_attempt {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        }
    }

    /// Record a send attempt at `now`, whatever its outcome.
    pub fn mark_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

impl Default for SendThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_INTERVAL)
    }
}

/// What happened to one processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameResult {
    /// No hand in the frame; nothing was classified.
    NoHand,
    /// Classified, but the throttle held the vector back.
    Throttled(CommandVector),
    /// Classified and accepted by the sink.
    Sent(CommandVector),
    /// Classified, but the sink rejected it.  The retry waits a full interval.
    Failed(CommandVector),
}

/// Per-session normalizer state.
#[derive(Debug, Clone, Default)]
pub struct GestureNormalizer {
    throttle: SendThrottle,
}

impl GestureNormalizer {
    pub fn new(send_interval: Duration) -> Self {
        Self {
            throttle: SendThrottle::new(send_interval),
        }
    }

    /// Classify `hand` (if any) and submit the vector to `sink` when the
    /// throttle allows it.
    pub fn on_frame(
        &mut self,
        hand: Option<&HandLandmarks>,
        now: Instant,
        sink: &dyn CommandSink,
    ) -> FrameResult {
        let Some(hand) = hand else {
            return FrameResult::NoHand;
        };
        let vector = classify(hand);
        if !self.throttle.ready(now) {
            trace!(%vector, "gesture throttled");
            return FrameResult::Throttled(vector);
        }
        self.throttle.mark_attempt(now);
        match sink.submit(vector) {
            Ok(()) => FrameResult::Sent(vector),
            Err(e) => {
                warn!(error = %e, %vector, "gesture command not sent");
                FrameResult::Failed(vector)
            }
        }
    }
}
