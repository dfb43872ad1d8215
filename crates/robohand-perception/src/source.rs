//! Upstream collaborator contracts and their line-oriented replay sources.
//!
//! The landmark detection engine and the speech-to-text engine live outside
//! this crate.  The session loops only talk to [`LandmarkSource`] and
//! [`TranscriptSource`], so a real engine, a recorded session, or a test
//! double can be plugged in without touching the pipeline.

use std::io::BufRead;

use robohand_types::HandError;
use tracing::debug;

use crate::landmarks::{HandLandmarks, RawDetection};

/// Output of the landmark engine for one processed frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameInput {
    /// One hand was detected.
    Hand(HandLandmarks),
    /// The frame was processed but contained no hand.
    NoHand,
    /// The video feed has ended.
    Ended,
}

/// A camera + landmark engine pair.
pub trait LandmarkSource: Send {
    /// Capture and process the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::InvalidLandmarks`] when the engine produced an
    /// unusable detection for this frame.  The caller skips the frame.
    fn next_frame(&mut self) -> Result<FrameInput, HandError>;
}

/// A microphone + speech-to-text engine pair.
pub trait TranscriptSource: Send {
    /// Wait for the next utterance and return its transcript, or `Ok(None)`
    /// once no more audio will arrive.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::RecognitionFailure`] when the utterance could not
    /// be transcribed.  The caller retries according to its policy.
    fn listen(&mut self) -> Result<Option<String>, HandError>;
}

/// Replays landmark detections stored one per line as JSON.
///
/// Each line is either `{"handedness":"Right","landmarks":[[x,y],...]}` with
/// 21 points, or `null` / blank for a frame without a hand.  End of input
/// ends the feed.
pub struct JsonLinesLandmarkSource<R> {
    input: R,
    line: String,
}

impl<R: BufRead + Send> JsonLinesLandmarkSource<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: String::new(),
        }
    }
}

impl<R: BufRead + Send> LandmarkSource for JsonLinesLandmarkSource<R> {
    fn next_frame(&mut self) -> Result<FrameInput, HandError> {
        self.line.clear();
        let n = self
            .input
            .read_line(&mut self.line)
            .map_err(|e| HandError::InvalidLandmarks(format!("landmark feed read failed: {e}")))?;
        if n == 0 {
            return Ok(FrameInput::Ended);
        }
        let text = self.line.trim();
        if text.is_empty() {
            return Ok(FrameInput::NoHand);
        }
        let raw: Option<RawDetection> = serde_json::from_str(text)
            .map_err(|e| HandError::InvalidLandmarks(format!("bad detection line: {e}")))?;
        match raw {
            Some(raw) => Ok(FrameInput::Hand(HandLandmarks::try_from(raw)?)),
            None => Ok(FrameInput::NoHand),
        }
    }
}

/// Reads one transcript per line.
///
/// A line starting with `!` stands for an utterance the engine failed to
/// recognise; the rest of the line is the failure reason.  Blank lines are
/// skipped.  End of input ends the stream.
pub struct LineTranscriptSource<R> {
    input: R,
}

impl<R: BufRead + Send> LineTranscriptSource<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead + Send> TranscriptSource for LineTranscriptSource<R> {
    fn listen(&mut self) -> Result<Option<String>, HandError> {
        loop {
            let mut line = String::new();
            let n = self
                .input
                .read_line(&mut line)
                .map_err(|e| HandError::RecognitionFailure(e.to_string()))?;
            if n == 0 {
                return Ok(None);
            }
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if let Some(reason) = text.strip_prefix('!') {
                return Err(HandError::RecognitionFailure(reason.trim().to_string()));
            }
            debug!(transcript = text, "utterance transcribed");
            return Ok(Some(text.to_string()));
        }
    }
}
