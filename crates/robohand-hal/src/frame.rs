//! Serial wire codec.
//!
//! Outbound, every command is a fixed 6-byte frame: the `$` sentinel followed
//! by one ASCII digit per finger, thumb first, with no terminator:
//!
//! ```text
//! $10101
//! ```
//!
//! Inbound, the microcontroller interleaves newline-terminated telemetry lines
//! of the form `#DATA:<bpm>,<field2>` with whatever else it prints.  Only the
//! first field is consumed.
//!
//! # Example
//!
//! ```rust
//! use robohand_hal::frame::{encode_frame, parse_telemetry};
//! use robohand_types::CommandVector;
//!
//! let v: CommandVector = "10101".parse().unwrap();
//! assert_eq!(&encode_frame(v), b"$10101");
//! assert_eq!(parse_telemetry("#DATA:72,0").unwrap(), 72);
//! ```

use robohand_types::{CommandVector, FINGER_COUNT, HandError};

/// First byte of every outbound frame.
pub const FRAME_SENTINEL: u8 = b'$';

/// Total length of an outbound frame in bytes.
pub const FRAME_LEN: usize = 1 + FINGER_COUNT;

/// Prefix identifying a telemetry line.
pub const TELEMETRY_MARKER: &str = "#DATA:";

/// Encode `vector` as the 6-byte outbound frame.
pub fn encode_frame(vector: CommandVector) -> [u8; FRAME_LEN] {
    let mut frame = [FRAME_SENTINEL; FRAME_LEN];
    frame[1..].copy_from_slice(&vector.digits());
    frame
}

/// Decode one outbound frame, as the microcontroller would.
///
/// # Errors
///
/// Returns [`HandError::InvalidVector`] when `bytes` is not exactly a sentinel
/// followed by five `0`/`1` digits.
pub fn decode_frame(bytes: &[u8]) -> Result<CommandVector, HandError> {
    match bytes.split_first() {
        Some((&FRAME_SENTINEL, digits)) if bytes.len() == FRAME_LEN => {
            let digits = std::str::from_utf8(digits)
                .map_err(|e| HandError::InvalidVector(e.to_string()))?;
            digits.parse()
        }
        _ => Err(HandError::InvalidVector(format!(
            "not a {FRAME_LEN}-byte frame: {:?}",
            String::from_utf8_lossy(bytes)
        ))),
    }
}

/// Extract the heart rate from a telemetry line.
///
/// The payload after [`TELEMETRY_MARKER`] must be a list of exactly two
/// comma-separated items whose first item is an integer.  Surrounding
/// whitespace on the line and on the integer is ignored.
///
/// # Errors
///
/// Returns [`HandError::MalformedTelemetry`] for anything else.  Callers treat
/// this as line noise, not as a fault.
pub fn parse_telemetry(line: &str) -> Result<i32, HandError> {
    let malformed = || HandError::MalformedTelemetry(line.to_string());

    let payload = line
        .trim()
        .strip_prefix(TELEMETRY_MARKER)
        .ok_or_else(malformed)?;
    let mut fields = payload.split(',');
    let (Some(bpm), Some(_), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(malformed());
    };
    bpm.trim().parse::<i32>().map_err(|_| malformed())
}
