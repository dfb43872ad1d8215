//! Voice Command Interpreter: transcript → [`VoiceCommand`].
//!
//! Matching is a case-insensitive substring search over French and English
//! keywords, evaluated in a fixed order:
//!
//! 1. `stop` anywhere ends the session, whatever else was said.
//! 2. An "open" keyword (`ouvre`, `open`, `6`, `six`) extends every finger.
//! 3. Otherwise a "close" keyword (`ferme`, `close`, `7`, `sept`) curls every
//!    finger.
//! 4. Otherwise each finger is extended independently when its name or its
//!    ordinal (`1`/`un` for the thumb … `5`/`cinq` for the little finger) is
//!    mentioned.  Unmentioned fingers stay curled.
//!
//! The open and close keywords win over any finger named in the same
//! utterance.
//!
//! # Example
//!
//! ```rust
//! use robohand_perception::voice::{interpret, VoiceCommand};
//!
//! assert_eq!(
//!     interpret("Lève l'index et le majeur"),
//!     VoiceCommand::Fingers("01100".parse().unwrap())
//! );
//! assert_eq!(interpret("ok STOP"), VoiceCommand::Stop);
//! ```

use std::time::Duration;

use robohand_types::{CommandVector, Finger};

/// Keyword that ends a voice session.
pub const STOP_KEYWORD: &str = "stop";

/// Keywords that extend every finger.
pub const OPEN_KEYWORDS: &[&str] = &["ouvre", "open", "6", "six"];

/// Keywords that curl every finger.
pub const CLOSE_KEYWORDS: &[&str] = &["ferme", "close", "7", "sept"];

/// Keywords that extend one finger.
pub fn finger_keywords(finger: Finger) -> &'static [&'static str] {
    match finger {
        Finger::Thumb => &["pouce", "thumb", "1", "un"],
        Finger::Index => &["index", "2", "deux"],
        Finger::Middle => &["majeur", "middle", "3", "trois"],
        Finger::Ring => &["annulaire", "ring", "4", "quatre"],
        Finger::Little => &["auriculaire", "petit doigt", "little", "5", "cinq"],
    }
}

/// Outcome of interpreting one utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    /// Drive the hand to this vector.
    Fingers(CommandVector),
    /// The speaker asked to end the session.
    Stop,
}

/// Interpret one transcript.
pub fn interpret(transcript: &str) -> VoiceCommand {
    let text = transcript.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

    if text.contains(STOP_KEYWORD) {
        return VoiceCommand::Stop;
    }
    if mentions(OPEN_KEYWORDS) {
        return VoiceCommand::Fingers(CommandVector::OPEN);
    }
    if mentions(CLOSE_KEYWORDS) {
        return VoiceCommand::Fingers(CommandVector::CLOSED);
    }
    let vector = Finger::ALL
        .iter()
        .fold(CommandVector::CLOSED, |v, &finger| {
            v.with_finger(finger, mentions(finger_keywords(finger)))
        });
    VoiceCommand::Fingers(vector)
}

/// How the voice loop reacts to consecutive recognition failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause before listening again after a failure.
    pub backoff: Duration,
    /// Give up after this many failures in a row; `None` retries forever.
    pub max_consecutive_failures: Option<u32>,
}

impl RetryPolicy {
    /// Retry immediately, forever.
    pub const UNBOUNDED: RetryPolicy = RetryPolicy {
        backoff: Duration::ZERO,
        max_consecutive_failures: None,
    };

    /// Delay to wait after the `failures`-th consecutive failure, or `None`
    /// when the loop should give up.
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        match self.max_consecutive_failures {
            Some(max) if failures >= max => None,
            _ => Some(self.backoff),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}
