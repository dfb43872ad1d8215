use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of fingers driven by the actuator.
pub const FINGER_COUNT: usize = 5;

/// One finger of the robotic hand, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    /// All fingers in the order they appear in a [`CommandVector`].
    pub const ALL: [Finger; FINGER_COUNT] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Little,
    ];

    /// Position of this finger inside a [`CommandVector`].
    pub fn position(self) -> usize {
        match self {
            Finger::Thumb => 0,
            Finger::Index => 1,
            Finger::Middle => 2,
            Finger::Ring => 3,
            Finger::Little => 4,
        }
    }

    /// Short human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Little => "little",
        }
    }
}

/// Actuator intent: one extended/curled bit per finger, thumb first.
///
/// The value is immutable once built. Producers supersede it with a new
/// vector rather than editing it in place.
///
/// On the wire and in JSON the vector is the 5-character digit string
/// (`"10101"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CommandVector([bool; FINGER_COUNT]);

impl CommandVector {
    /// Every finger extended (`11111`).
    pub const OPEN: CommandVector = CommandVector([true; FINGER_COUNT]);
    /// Every finger curled (`00000`).
    pub const CLOSED: CommandVector = CommandVector([false; FINGER_COUNT]);

    /// Build a vector from one flag per finger, thumb first.
    pub fn from_bits(bits: [bool; FINGER_COUNT]) -> Self {
        Self(bits)
    }

    /// Return a new vector equal to `self` except for `finger`.
    #[must_use]
    pub fn with_finger(self, finger: Finger, extended: bool) -> Self {
        let mut bits = self.0;
        bits[finger.position()] = extended;
        Self(bits)
    }

    /// `true` when `finger` is extended.
    pub fn is_extended(&self, finger: Finger) -> bool {
        self.0[finger.position()]
    }

    /// The raw flags, thumb first.
    pub fn bits(&self) -> [bool; FINGER_COUNT] {
        self.0
    }

    /// The ASCII digits `b'0'`/`b'1'` for each finger, thumb first.
    pub fn digits(&self) -> [u8; FINGER_COUNT] {
        self.0.map(|b| if b { b'1' } else { b'0' })
    }

    /// The vector as a `"10101"`-style string.
    pub fn to_digit_string(&self) -> String {
        self.digits().iter().map(|&d| d as char).collect()
    }
}

impl fmt::Display for CommandVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_digit_string())
    }
}

impl FromStr for CommandVector {
    type Err = HandError;

    /// Parse exactly five `0`/`1` characters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != FINGER_COUNT {
            return Err(HandError::InvalidVector(format!(
                "expected {FINGER_COUNT} digits, got {:?}",
                s
            )));
        }
        let mut bits = [false; FINGER_COUNT];
        for (bit, &byte) in bits.iter_mut().zip(bytes) {
            *bit = match byte {
                b'0' => false,
                b'1' => true,
                other => {
                    return Err(HandError::InvalidVector(format!(
                        "invalid digit {:?} in {:?}",
                        other as char, s
                    )));
                }
            };
        }
        Ok(Self(bits))
    }
}

impl From<CommandVector> for String {
    fn from(v: CommandVector) -> Self {
        v.to_digit_string()
    }
}

impl TryFrom<String> for CommandVector {
    type Error = HandError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Which hand the landmark engine classified the detection as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handedness::Left => write!(f, "Left"),
            Handedness::Right => write!(f, "Right"),
        }
    }
}

/// Input modality driving the actuator for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Camera,
    Voice,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Camera => write!(f, "camera"),
            Mode::Voice => write!(f, "voice"),
        }
    }
}

/// Push-update message delivered to every dashboard observer.
///
/// Serialises as `{"fingers":"10101","bpm":72}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub fingers: CommandVector,
    pub bpm: i32,
}

/// Anything that can accept a [`CommandVector`] on behalf of the actuator.
///
/// The gesture and voice pipelines only ever talk to this trait; the runtime
/// supplies an implementation that writes to the serial link, records the
/// vector in the session state and notifies observers.
pub trait CommandSink: Send + Sync {
    /// Submit `vector` to the actuator.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::Transport`] when the vector could not be written.
    /// Callers log it and carry on.
    fn submit(&self, vector: CommandVector) -> Result<(), HandError>;
}

/// Error type shared by every robohand crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandError {
    #[error("Serial link unavailable on {port}: {details}")]
    LinkUnavailable { port: String, details: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed telemetry line: {0:?}")]
    MalformedTelemetry(String),

    #[error("Recognition failure: {0}")]
    RecognitionFailure(String),

    #[error("Invalid selection: {0:?}")]
    InvalidSelection(String),

    #[error("Invalid command vector: {0}")]
    InvalidVector(String),

    #[error("Invalid landmarks: {0}")]
    InvalidLandmarks(String),

    #[error("Session mode already set to {0}")]
    ModeAlreadySet(Mode),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_string_follows_finger_order() {
        let v = CommandVector::from_bits([true, false, true, false, true]);
        assert_eq!(v.to_digit_string(), "10101");
        assert_eq!(v.digits(), *b"10101");
        assert!(v.is_extended(Finger::Thumb));
        assert!(!v.is_extended(Finger::Index));
        assert!(v.is_extended(Finger::Little));
    }

    #[test]
    fn with_finger_leaves_original_untouched() {
        let closed = CommandVector::CLOSED;
        let index_up = closed.with_finger(Finger::Index, true);
        assert_eq!(closed.to_string(), "00000");
        assert_eq!(index_up.to_string(), "01000");
    }

    #[test]
    fn parse_rejects_wrong_length_and_digits() {
        assert!("1010".parse::<CommandVector>().is_err());
        assert!("101010".parse::<CommandVector>().is_err());
        assert!("10201".parse::<CommandVector>().is_err());
        assert_eq!(
            "11111".parse::<CommandVector>().unwrap(),
            CommandVector::OPEN
        );
    }

    #[test]
    fn state_update_json_shape() {
        let update = StateUpdate {
            fingers: "01100".parse().unwrap(),
            bpm: 72,
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"fingers":"01100","bpm":72}"#);

        let back: StateUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, update);
    }

    #[test]
    fn state_update_rejects_bad_fingers() {
        let res = serde_json::from_str::<StateUpdate>(r#"{"fingers":"0110","bpm":1}"#);
        assert!(res.is_err());
    }

    #[test]
    fn finger_positions_are_wire_order() {
        for (i, f) in Finger::ALL.iter().enumerate() {
            assert_eq!(f.position(), i);
        }
    }

    #[test]
    fn hand_error_display() {
        let err = HandError::LinkUnavailable {
            port: "COM5".to_string(),
            details: "no such device".to_string(),
        };
        assert!(err.to_string().contains("COM5"));
        assert!(HandError::ModeAlreadySet(Mode::Voice).to_string().contains("voice"));
    }
}
